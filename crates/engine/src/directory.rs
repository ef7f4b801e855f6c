//! Character directory — identity lookup, exact and fuzzy.

use std::collections::HashMap;

use threadloom_core::{Character, Error, Result, validate_character_id};

/// Minimum similarity (0–100 scale) for a fuzzy display-name match.
const FUZZY_THRESHOLD: f64 = 50.0;

/// The character roster for one session, immutable once built.
///
/// Reconfiguration replaces the whole directory; it is never mutated in
/// place.
pub struct CharacterDirectory {
    characters: Vec<Character>,
    by_id: HashMap<String, usize>,
}

impl CharacterDirectory {
    /// Build a directory, validating every id and rejecting duplicates.
    pub fn new(characters: Vec<Character>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(characters.len());
        for (index, character) in characters.iter().enumerate() {
            validate_character_id(&character.id)?;
            if by_id.insert(character.id.clone(), index).is_some() {
                return Err(Error::invalid_argument(format!(
                    "duplicate character identifier \"{}\"",
                    character.id
                )));
            }
        }
        Ok(Self { characters, by_id })
    }

    pub fn get(&self, id: &str) -> Result<&Character> {
        self.by_id
            .get(id)
            .map(|&index| &self.characters[index])
            .ok_or_else(|| Error::character_not_found(id))
    }

    /// All characters, directory order.
    pub fn list_all(&self) -> &[Character] {
        &self.characters
    }

    /// All ids, directory order.
    pub fn ids(&self) -> Vec<String> {
        self.characters.iter().map(|c| c.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    /// Resolve free text to a character id.
    ///
    /// An exact id match (lowercased) always wins, even when some display
    /// name would fuzzy-match better. Otherwise the highest-scoring display
    /// name wins if it clears [`FUZZY_THRESHOLD`].
    pub fn resolve(&self, text: &str) -> Result<String> {
        let candidate = text.trim().to_lowercase();
        if self.by_id.contains_key(&candidate) {
            return Ok(candidate);
        }

        let best = self
            .characters
            .iter()
            .map(|c| (name_similarity(text, &c.display_name), c))
            .max_by(|(a, _), (b, _)| a.total_cmp(b));

        match best {
            Some((score, character)) if score >= FUZZY_THRESHOLD => Ok(character.id.clone()),
            _ => Err(Error::character_not_found(text.trim())),
        }
    }

    /// [`resolve`](Self::resolve), returning the character itself.
    pub fn resolve_character(&self, text: &str) -> Result<&Character> {
        let id = self.resolve(text)?;
        self.get(&id)
    }
}

/// Similarity of a query against a display name on a 0–100 scale.
///
/// Case-insensitive, whitespace-normalized Jaro-Winkler; multi-word names
/// are also compared with their words sorted, taking the better score, so
/// "marley bob" still finds "Bob Marley".
fn name_similarity(query: &str, name: &str) -> f64 {
    let query = normalize(query);
    let name = normalize(name);

    let direct = strsim::jaro_winkler(&query, &name);
    let token_sorted = strsim::jaro_winkler(&sort_tokens(&query), &sort_tokens(&name));
    direct.max(token_sorted) * 100.0
}

fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn sort_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character(id: &str, name: &str) -> Character {
        Character {
            id: id.into(),
            display_name: name.into(),
            color: "black".into(),
            public_knowledge: String::new(),
            private_knowledge: String::new(),
        }
    }

    fn directory() -> CharacterDirectory {
        CharacterDirectory::new(vec![
            character("alice", "Alice"),
            character("bob", "Bob Marley"),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_invalid_and_duplicate_ids() {
        assert!(CharacterDirectory::new(vec![character("Alice", "Alice")]).is_err());
        assert!(
            CharacterDirectory::new(vec![character("alice", "A"), character("alice", "B")])
                .is_err()
        );
    }

    #[test]
    fn resolves_exact_id_case_insensitively() {
        let directory = directory();
        assert_eq!(directory.resolve("alice").unwrap(), "alice");
        assert_eq!(directory.resolve("ALICE").unwrap(), "alice");
        assert_eq!(directory.resolve("  Bob ").unwrap(), "bob");
    }

    #[test]
    fn exact_id_beats_better_fuzzy_name() {
        // "rob" is the id of a character whose display name is nothing like
        // it, while another character is literally displayed as "Rob".
        let directory = CharacterDirectory::new(vec![
            character("rob", "Zebulon"),
            character("robert", "Rob"),
        ])
        .unwrap();
        assert_eq!(directory.resolve("rob").unwrap(), "rob");
    }

    #[test]
    fn fuzzy_matches_display_names() {
        let directory = directory();
        assert_eq!(directory.resolve("Alise").unwrap(), "alice");
        assert_eq!(directory.resolve("bob marley").unwrap(), "bob");
        assert_eq!(directory.resolve("marley bob").unwrap(), "bob");
    }

    #[test]
    fn unmatched_text_is_not_found() {
        let directory = directory();
        let err = directory.resolve("qwxz").unwrap_err();
        assert!(err.to_string().contains("qwxz"));
        assert!(err.is_client_error());
    }

    #[test]
    fn list_all_preserves_directory_order() {
        let directory = directory();
        let ids = directory.ids();
        assert_eq!(ids, ["alice", "bob"]);
    }
}
