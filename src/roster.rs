use crate::actor::Actor;
use crate::character::Character;
use crate::graph::SceneManager;
use crate::state::AssetFactory;

const INVALID_TITLE: &str = "<Invalid>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub title: String,
    pub character: Character,
}

impl From<Character> for RosterEntry {
    fn from(character: Character) -> Self {
        Self {
            title: character.title().to_string(),
            character,
        }
    }
}

/// The characters a player may choose from.
///
/// Entries are populated on first use; a roster built with [`Roster::new`]
/// offers a single stock character.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: Option<Vec<RosterEntry>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_characters(characters: impl IntoIterator<Item = Character>) -> Self {
        Self {
            entries: Some(characters.into_iter().map(RosterEntry::from).collect()),
        }
    }

    fn entries(&mut self) -> &[RosterEntry] {
        self.entries
            .get_or_insert_with(|| vec![RosterEntry::from(Character::default())])
    }

    pub fn count(&mut self) -> usize {
        self.entries().len()
    }

    pub fn title(&mut self, index: usize) -> String {
        self.entries()
            .get(index)
            .map_or_else(|| INVALID_TITLE.to_string(), |entry| entry.title.clone())
    }

    /// A fresh copy of a character, without an actor.
    pub fn character(&mut self, index: usize) -> Option<Character> {
        self.entries().get(index).map(|entry| entry.character.clone())
    }

    /// An actor showing the character, not bound to it.
    pub fn dummy(
        &mut self,
        index: usize,
        factory: &dyn AssetFactory,
        manager: Option<&SceneManager>,
    ) -> Option<Actor> {
        let entry = self.entries().get(index)?;
        entry.character.create_dummy(factory, manager, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Placeable;
    use crate::state::StockFactory;
    use crate::testing::AssetTree;

    #[test]
    fn stock_roster_has_one_player() {
        let mut roster = Roster::new();
        assert_eq!(roster.count(), 1);
        assert_eq!(roster.title(0), "Player");
        assert_eq!(roster.title(1), "<Invalid>");
        assert_eq!(roster.character(0).unwrap().actor_name(), "player");
        assert!(roster.character(1).is_none());
    }

    #[test]
    fn custom_rosters_keep_their_order() {
        let mut roster = Roster::with_characters([
            Character::new("Knight", "knight"),
            Character::new("Rogue", "rogue"),
        ]);
        assert_eq!(roster.count(), 2);
        assert_eq!(roster.title(1), "Rogue");
        assert_eq!(Roster::with_characters([]).count(), 0);
    }

    #[test]
    fn dummies_are_unbound_actors() {
        let assets = AssetTree::stock();
        let factory = StockFactory::new(assets.context().clone());
        let manager = SceneManager::new("test");
        let mut roster = Roster::new();
        let dummy = roster.dummy(0, &factory, Some(&manager)).unwrap();
        assert!(dummy.character().is_none());
        assert_eq!(dummy.node_name().as_deref(), Some("actor::player"));
        assert!(roster.dummy(5, &factory, None).is_none());
    }
}
