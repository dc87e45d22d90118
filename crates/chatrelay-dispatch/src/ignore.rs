//! Operator ignore list.
//!
//! A contact is ignored when any configured entry occurs as a substring of
//! its remark name, nickname or in-group display name. Empty entries are
//! skipped; they would otherwise match everyone.

use chatrelay_channels::Contact;

/// Returns `true` when `contact` matches one of `ignores`.
pub fn is_ignored(ignores: &[String], contact: &Contact) -> bool {
    ignores
        .iter()
        .filter(|entry| !entry.is_empty())
        .any(|entry| contact.names().iter().any(|name| name.contains(entry.as_str())))
}
