//! Reversible placeholder mapping for one request

use crate::pii::EntityType;

/// One anonymized value
#[derive(Debug, Clone, PartialEq, Eq)]
struct VaultEntry {
    entity_type: EntityType,
    placeholder: String,
    original: String,
}

/// Maps placeholders such as `[REDACTED_PERSON_1]` back to the text they
/// replaced.
///
/// Lives inside [`GuardContext`](crate::GuardContext); a vault is never
/// shared between prompts.
#[derive(Debug, Clone, Default)]
pub struct Vault {
    entries: Vec<VaultEntry>,
    /// Placeholder-shaped text the user wrote; never handed out
    reserved: Vec<String>,
}

impl Vault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Placeholder for `original`, reusing an existing one for the same value
    pub fn placeholder_for(&mut self, entity_type: EntityType, original: &str) -> String {
        if let Some(entry) = self
            .entries
            .iter()
            .find(|e| e.entity_type == entity_type && e.original == original)
        {
            return entry.placeholder.clone();
        }

        let mut index = self
            .entries
            .iter()
            .filter(|e| e.entity_type == entity_type)
            .count()
            + 1;
        let mut placeholder = format!("[REDACTED_{}_{}]", entity_type, index);
        while self.is_taken(&placeholder) {
            index += 1;
            placeholder = format!("[REDACTED_{}_{}]", entity_type, index);
        }
        self.entries.push(VaultEntry {
            entity_type,
            placeholder: placeholder.clone(),
            original: original.to_string(),
        });
        placeholder
    }

    /// Keep `placeholder` out of circulation because it already occurs
    /// literally in the text being anonymized
    pub fn reserve(&mut self, placeholder: &str) {
        if !self.reserved.iter().any(|r| r == placeholder) {
            self.reserved.push(placeholder.to_string());
        }
    }

    fn is_taken(&self, placeholder: &str) -> bool {
        self.reserved.iter().any(|r| r == placeholder)
            || self.entries.iter().any(|e| e.placeholder == placeholder)
    }

    /// Replace every known placeholder in `text` with its original value
    pub fn restore(&self, text: &str) -> (String, usize) {
        let mut restored = text.to_string();
        let mut count = 0;
        for entry in &self.entries {
            let hits = restored.matches(entry.placeholder.as_str()).count();
            if hits > 0 {
                restored = restored.replace(entry.placeholder.as_str(), &entry.original);
                count += hits;
            }
        }
        (restored, count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_are_numbered_per_type() {
        let mut vault = Vault::new();
        assert_eq!(
            vault.placeholder_for(EntityType::Person, "Peter Double"),
            "[REDACTED_PERSON_1]"
        );
        assert_eq!(
            vault.placeholder_for(EntityType::UsSsn, "172-55-3546"),
            "[REDACTED_US_SSN_1]"
        );
        assert_eq!(
            vault.placeholder_for(EntityType::Person, "Jane Roe"),
            "[REDACTED_PERSON_2]"
        );
        assert_eq!(vault.len(), 3);
    }

    #[test]
    fn test_same_value_reuses_placeholder() {
        let mut vault = Vault::new();
        let first = vault.placeholder_for(EntityType::Person, "Peter Double");
        let second = vault.placeholder_for(EntityType::Person, "Peter Double");
        assert_eq!(first, second);
        assert_eq!(vault.len(), 1);
    }

    #[test]
    fn test_restore() {
        let mut vault = Vault::new();
        let name = vault.placeholder_for(EntityType::Person, "Peter Double");
        let ssn = vault.placeholder_for(EntityType::UsSsn, "172-55-3546");

        let text = format!("{} has SSN {}. {} again.", name, ssn, name);
        let (restored, count) = vault.restore(&text);

        assert_eq!(
            restored,
            "Peter Double has SSN 172-55-3546. Peter Double again."
        );
        assert_eq!(count, 3);

        let (untouched, count) = vault.restore("[REDACTED_PERSON_9] is unknown");
        assert_eq!(untouched, "[REDACTED_PERSON_9] is unknown");
        assert_eq!(count, 0);
    }

    #[test]
    fn test_reserved_placeholders_are_skipped() {
        let mut vault = Vault::new();
        vault.reserve("[REDACTED_PERSON_1]");
        vault.reserve("[REDACTED_PERSON_3]");

        let first = vault.placeholder_for(EntityType::Person, "Peter Double");
        let second = vault.placeholder_for(EntityType::Person, "Jane Roe");
        assert_eq!(first, "[REDACTED_PERSON_2]");
        assert_eq!(second, "[REDACTED_PERSON_4]");

        let (restored, _) = vault.restore("[REDACTED_PERSON_1] and [REDACTED_PERSON_2]");
        assert_eq!(restored, "[REDACTED_PERSON_1] and Peter Double");
    }
}
