//! Decoding of the catalog service's `thing` and `family` XML responses.
//!
//! Both endpoints wrap results in `<items>`; only the first `<item>` is read.
//! An `<items>` element with no `<item>` means the id did not resolve to an
//! entry of the requested kind.

use std::collections::BTreeSet;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tabletop_catalog::{CatalogId, FamilyEntity, GameEntity, GameKind};

use crate::error::FetchError;

/// Link relation that marks family membership on a game.
pub const FAMILY_RELATION: &str = "boardgamefamily";

/// A `<name>` entry on a thing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameEntry {
    /// "primary" or "alternate".
    pub variant: String,
    pub value: String,
}

/// A `<link>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub relation: String,
    pub id: CatalogId,
}

/// Decoded `thing` item.
#[derive(Debug, Clone, Default)]
pub struct ThingPayload {
    pub item_type: Option<String>,
    pub id: Option<CatalogId>,
    pub names: Vec<NameEntry>,
    pub year_published: i32,
    pub links: Vec<Link>,
    pub rating_count: u32,
    pub average_rating: f64,
}

impl ThingPayload {
    /// The name tagged "primary", falling back to the first name when none is
    /// tagged (upstream occasionally omits the tag).
    pub fn display_name(&self) -> Option<&str> {
        self.names
            .iter()
            .find(|n| n.variant == "primary")
            .or_else(|| self.names.first())
            .map(|n| n.value.as_str())
    }

    /// Targets of family-membership links.
    ///
    /// Other relations (category, mechanic, designer, artist, publisher) can't
    /// be expanded because the service can't be queried by them.
    pub fn family_ids(&self) -> BTreeSet<CatalogId> {
        self.links
            .iter()
            .filter(|l| l.relation == FAMILY_RELATION)
            .map(|l| l.id)
            .collect()
    }

    /// Convert into a catalog entity. `requested` is the id that was queried.
    pub fn into_game(self, requested: CatalogId) -> Result<GameEntity, FetchError> {
        let not_a_game = || FetchError::NotACatalogEntry {
            kind: "game",
            id: requested,
        };

        let name = self.display_name().ok_or_else(not_a_game)?.to_string();
        let kind = match self.item_type.as_deref() {
            Some(tag) => tag.parse::<GameKind>().map_err(|_| not_a_game())?,
            None => {
                return Err(FetchError::MalformedPayload(format!(
                    "game {requested}: item has no type"
                )));
            }
        };

        Ok(GameEntity {
            id: self.id.unwrap_or(requested),
            name,
            kind,
            family_ids: self.family_ids(),
            rating_count: self.rating_count,
            average_rating: self.average_rating,
            year_published: self.year_published,
            refreshed_at: None,
        })
    }
}

/// Decoded `family` item.
#[derive(Debug, Clone, Default)]
pub struct FamilyPayload {
    pub id: Option<CatalogId>,
    pub name: Option<String>,
    pub links: Vec<Link>,
}

impl FamilyPayload {
    /// Convert into a catalog entity. Every link is a member game.
    pub fn into_family(self, requested: CatalogId) -> Result<FamilyEntity, FetchError> {
        let name = self.name.ok_or_else(|| {
            FetchError::MalformedPayload(format!("family {requested}: item has no name"))
        })?;
        Ok(FamilyEntity {
            id: self.id.unwrap_or(requested),
            name,
            game_ids: self.links.iter().map(|l| l.id).collect(),
            refreshed_at: None,
        })
    }
}

/// Decode a `thing` response. Returns `None` if it contains no item.
pub fn decode_thing(xml: &str) -> Result<Option<ThingPayload>, FetchError> {
    let mut thing: Option<ThingPayload> = None;
    walk_first_item(xml, |element, direct_child| {
        let payload = thing.get_or_insert_with(ThingPayload::default);
        match element.tag.as_str() {
            "item" => {
                payload.item_type = element.attr("type");
                payload.id = element.parse_attr("id")?;
            }
            "name" if direct_child => {
                if let Some(value) = element.attr("value") {
                    payload.names.push(NameEntry {
                        variant: element.attr("type").unwrap_or_default(),
                        value,
                    });
                }
            }
            "yearpublished" if direct_child => {
                payload.year_published = element.parse_attr("value")?.unwrap_or(0);
            }
            "link" if direct_child => {
                if let Some(link) = element.link()? {
                    payload.links.push(link);
                }
            }
            "usersrated" if !direct_child => {
                payload.rating_count = element.parse_attr("value")?.unwrap_or(0);
            }
            "average" if !direct_child => {
                payload.average_rating = element.parse_attr("value")?.unwrap_or(0.0);
            }
            _ => {}
        }
        Ok(())
    })?;
    Ok(thing)
}

/// Decode a `family` response. Returns `None` if it contains no item.
pub fn decode_family(xml: &str) -> Result<Option<FamilyPayload>, FetchError> {
    let mut family: Option<FamilyPayload> = None;
    walk_first_item(xml, |element, direct_child| {
        let payload = family.get_or_insert_with(FamilyPayload::default);
        match element.tag.as_str() {
            "item" => payload.id = element.parse_attr("id")?,
            // Families carry a single name; keep the first.
            "name" if direct_child && payload.name.is_none() => {
                payload.name = element.attr("value");
            }
            "link" if direct_child => {
                if let Some(link) = element.link()? {
                    payload.links.push(link);
                }
            }
            _ => {}
        }
        Ok(())
    })?;
    Ok(family)
}

// ── Event walking ───────────────────────────────────────────────────────────

/// An element's tag name and decoded attributes.
struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
}

impl Element {
    fn from_start(e: &BytesStart<'_>) -> Result<Self, FetchError> {
        let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr.unescape_value()?.into_owned();
            attrs.push((key, value));
        }
        Ok(Self { tag, attrs })
    }

    fn attr(&self, key: &str) -> Option<String> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    fn parse_attr<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, FetchError> {
        match self.attr(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
                FetchError::MalformedPayload(format!(
                    "<{}> has invalid {} '{}'",
                    self.tag, key, raw
                ))
            }),
        }
    }

    fn link(&self) -> Result<Option<Link>, FetchError> {
        let id = self.parse_attr::<CatalogId>("id")?;
        Ok(id.map(|id| Link {
            relation: self.attr("type").unwrap_or_default(),
            id,
        }))
    }
}

/// Visit the first `<item>` element and everything inside it.
///
/// The callback receives each element (the item itself first) and whether it
/// is a direct child of the item. Walking stops when the item closes.
fn walk_first_item<F>(xml: &str, mut visit: F) -> Result<(), FetchError>
where
    F: FnMut(&Element, bool) -> Result<(), FetchError>,
{
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut depth = 0usize;
    let mut item_depth: Option<usize> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                handle_open(e, depth, &mut item_depth, &mut visit)?;
                depth += 1;
            }
            Event::Empty(ref e) => {
                let was_open = item_depth.is_some();
                handle_open(e, depth, &mut item_depth, &mut visit)?;
                // `<item/>` opens and closes in one event.
                if !was_open && item_depth == Some(depth) {
                    return Ok(());
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if item_depth == Some(depth) {
                    return Ok(());
                }
            }
            Event::Eof => {
                if item_depth.is_some() {
                    return Err(FetchError::MalformedPayload(
                        "document ended inside <item>".to_string(),
                    ));
                }
                return Ok(());
            }
            _ => {}
        }
    }
}

fn handle_open<F>(
    e: &BytesStart<'_>,
    depth: usize,
    item_depth: &mut Option<usize>,
    visit: &mut F,
) -> Result<(), FetchError>
where
    F: FnMut(&Element, bool) -> Result<(), FetchError>,
{
    match *item_depth {
        None => {
            if e.name().as_ref() == b"item" {
                *item_depth = Some(depth);
                visit(&Element::from_start(e)?, false)?;
            }
        }
        Some(item) => {
            visit(&Element::from_start(e)?, depth == item + 1)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATAN_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<items termsofuse="https://boardgamegeek.com/xmlapi/termsofuse">
  <item type="boardgame" id="13">
    <thumbnail>https://example.invalid/catan.jpg</thumbnail>
    <name type="alternate" sortindex="1" value="Die Siedler von Catan" />
    <name type="primary" sortindex="1" value="CATAN" />
    <description>Trade &amp; build.</description>
    <yearpublished value="1995" />
    <minplayers value="3" />
    <link type="boardgamecategory" id="1026" value="Negotiation" />
    <link type="boardgamefamily" id="3" value="Game: Catan" />
    <link type="boardgamemechanic" id="2072" value="Dice Rolling" />
    <link type="boardgamefamily" id="87" value="Players: Three to Four" />
    <link type="boardgamepublisher" id="37" value="KOSMOS" />
    <statistics page="1">
      <ratings>
        <usersrated value="123456" />
        <average value="7.09" />
        <bayesaverage value="6.9" />
        <ranks>
          <rank type="subtype" id="1" name="boardgame" value="512" />
        </ranks>
      </ratings>
    </statistics>
  </item>
</items>"#;

    const FAMILY_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<items termsofuse="https://boardgamegeek.com/xmlapi/termsofuse">
  <item type="boardgamefamily" id="3">
    <name type="primary" sortindex="1" value="Game: Catan &amp; Friends" />
    <description>All the Catan things.</description>
    <link type="boardgamefamily" id="13" value="CATAN" inbound="true" />
    <link type="boardgamefamily" id="926" value="Catan: Seafarers" inbound="true" />
  </item>
</items>"#;

    #[test]
    fn decodes_thing_fields() {
        let thing = decode_thing(CATAN_XML).unwrap().unwrap();
        assert_eq!(thing.item_type.as_deref(), Some("boardgame"));
        assert_eq!(thing.id, Some(13));
        assert_eq!(thing.names.len(), 2);
        assert_eq!(thing.year_published, 1995);
        assert_eq!(thing.links.len(), 5);
        assert_eq!(thing.rating_count, 123456);
        assert!((thing.average_rating - 7.09).abs() < 1e-9);
    }

    #[test]
    fn game_keeps_only_family_links() {
        let game = decode_thing(CATAN_XML).unwrap().unwrap().into_game(13).unwrap();
        assert_eq!(game.name, "CATAN");
        assert_eq!(game.kind, GameKind::BaseGame);
        assert_eq!(game.family_ids, BTreeSet::from([3, 87]));
        assert_eq!(game.refreshed_at, None);
    }

    #[test]
    fn display_name_falls_back_to_first_entry() {
        let thing = ThingPayload {
            names: vec![
                NameEntry {
                    variant: "alternate".to_string(),
                    value: "First".to_string(),
                },
                NameEntry {
                    variant: "alternate".to_string(),
                    value: "Second".to_string(),
                },
            ],
            ..Default::default()
        };
        assert_eq!(thing.display_name(), Some("First"));
    }

    #[test]
    fn thing_without_names_is_not_a_catalog_entry() {
        let xml = r#"<items><item type="boardgame" id="42"><yearpublished value="2001"/></item></items>"#;
        let result = decode_thing(xml).unwrap().unwrap().into_game(42);
        assert!(matches!(
            result,
            Err(FetchError::NotACatalogEntry { kind: "game", id: 42 })
        ));
    }

    #[test]
    fn empty_items_decode_to_none() {
        let xml = r#"<?xml version="1.0"?><items termsofuse="x"></items>"#;
        assert!(decode_thing(xml).unwrap().is_none());
        assert!(decode_family(xml).unwrap().is_none());
    }

    #[test]
    fn unknown_item_type_is_not_a_catalog_entry() {
        let xml = r#"<items><item type="videogame" id="7"><name type="primary" value="Pong"/></item></items>"#;
        let result = decode_thing(xml).unwrap().unwrap().into_game(7);
        assert!(matches!(result, Err(FetchError::NotACatalogEntry { .. })));
    }

    #[test]
    fn expansion_kind_is_decoded() {
        let xml = r#"<items><item type="boardgameexpansion" id="926"><name type="primary" value="Seafarers"/></item></items>"#;
        let game = decode_thing(xml).unwrap().unwrap().into_game(926).unwrap();
        assert_eq!(game.kind, GameKind::Expansion);
        assert_eq!(game.year_published, 0);
        assert!(game.family_ids.is_empty());
    }

    #[test]
    fn invalid_number_is_malformed() {
        let xml = r#"<items><item type="boardgame" id="13"><yearpublished value="soon"/></item></items>"#;
        assert!(matches!(
            decode_thing(xml),
            Err(FetchError::MalformedPayload(_))
        ));
    }

    #[test]
    fn truncated_document_is_malformed() {
        let xml = r#"<items><item type="boardgame" id="13"><name type="primary" value="Cut"/>"#;
        assert!(decode_thing(xml).is_err());
    }

    #[test]
    fn decodes_family_members() {
        let family = decode_family(FAMILY_XML)
            .unwrap()
            .unwrap()
            .into_family(3)
            .unwrap();
        assert_eq!(family.id, 3);
        assert_eq!(family.name, "Game: Catan & Friends");
        assert_eq!(family.game_ids, BTreeSet::from([13, 926]));
    }

    #[test]
    fn only_first_item_is_read() {
        let xml = r#"<items>
            <item type="boardgamefamily" id="1"><name value="One"/><link id="10"/></item>
            <item type="boardgamefamily" id="2"><name value="Two"/><link id="20"/></item>
        </items>"#;
        let family = decode_family(xml).unwrap().unwrap().into_family(1).unwrap();
        assert_eq!(family.name, "One");
        assert_eq!(family.game_ids, BTreeSet::from([10]));
    }
}
