//! Address-book oracle used by the address and category functions.

use serde::{Deserialize, Serialize};

/// Answers address-book membership questions for the evaluator.
///
/// Implementations are expected to compare addresses case-insensitively.
pub trait AddressBook {
    /// Returns true if the address belongs to a known contact.
    fn contains_address(&self, address: &str) -> bool;

    /// Returns true if the address belongs to a contact in `category`.
    fn in_category(&self, address: &str, category: &str) -> bool;
}

/// A contact known to the address book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Email address (unique identifier).
    pub email: String,
    /// Display name (may be empty).
    pub name: String,
    /// Category names the contact belongs to.
    #[serde(default)]
    pub categories: Vec<String>,
}

impl Contact {
    /// Creates a new contact without categories.
    #[must_use]
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            categories: Vec::new(),
        }
    }

    /// Adds a category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    /// Checks if the contact is in the category (case-insensitive).
    #[must_use]
    pub fn in_category(&self, category: &str) -> bool {
        self.categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category))
    }
}

/// In-memory address book.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactList {
    contacts: Vec<Contact>,
}

impl ContactList {
    /// Creates an empty address book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a contact, replacing any contact with the same address.
    pub fn add(&mut self, contact: Contact) {
        self.contacts
            .retain(|c| !c.email.eq_ignore_ascii_case(&contact.email));
        self.contacts.push(contact);
    }

    /// Finds a contact by address (case-insensitive).
    #[must_use]
    pub fn find(&self, address: &str) -> Option<&Contact> {
        let address = address.trim();
        self.contacts
            .iter()
            .find(|c| c.email.eq_ignore_ascii_case(address))
    }

    /// Returns the number of contacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Returns true if the address book is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}

impl FromIterator<Contact> for ContactList {
    fn from_iter<T: IntoIterator<Item = Contact>>(iter: T) -> Self {
        let mut list = Self::new();
        for contact in iter {
            list.add(contact);
        }
        list
    }
}

impl AddressBook for ContactList {
    fn contains_address(&self, address: &str) -> bool {
        self.find(address).is_some()
    }

    fn in_category(&self, address: &str, category: &str) -> bool {
        self.find(address).is_some_and(|c| c.in_category(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> ContactList {
        [
            Contact::new("alice@example.com", "Alice").with_category("Family"),
            Contact::new("bob@example.com", "").with_category("Work"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_contains_address_case_insensitive() {
        let book = book();
        assert!(book.contains_address("Alice@Example.COM"));
        assert!(!book.contains_address("carol@example.com"));
    }

    #[test]
    fn test_in_category() {
        let book = book();
        assert!(book.in_category("alice@example.com", "family"));
        assert!(!book.in_category("alice@example.com", "Work"));
        assert!(!book.in_category("carol@example.com", "Work"));
    }

    #[test]
    fn test_add_replaces_same_address() {
        let mut book = book();
        book.add(Contact::new("ALICE@example.com", "Alice Smith"));
        assert_eq!(book.len(), 2);
        assert_eq!(
            book.find("alice@example.com").map(|c| c.name.as_str()),
            Some("Alice Smith")
        );
    }
}
