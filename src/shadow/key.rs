use crate::shadow;

/// Prefix of every main record sort key.
pub const MAIN_KEY_PREFIX: &str = "id#";

/// Segment between the encoded value and the owning id of a shadow key.
pub const ID_SEGMENT: &str = "#id#";

/// Sorts after every character a key can contain.
pub const HIGH_SENTINEL: char = '\u{10FFFF}';

/// Sort key of the main record of `id`.
pub fn main_key(id: &str) -> String {
    format!("{MAIN_KEY_PREFIX}{id}")
}

/// Id of a main record sort key.
pub fn main_key_id(sort_key: &str) -> Option<&str> {
    sort_key.strip_prefix(MAIN_KEY_PREFIX)
}

/// `<field>#<encoded>#id#<id>`
pub fn shadow_key(field: &str, encoded: &str, id: &str) -> String {
    format!("{field}{}{encoded}{ID_SEGMENT}{id}", shadow::SEPARATOR)
}

/// Prefix shared by every shadow key of `field`.
pub fn field_prefix(field: &str) -> String {
    format!("{field}{}", shadow::SEPARATOR)
}

/// Upper bound of the key range of `field`.
pub fn field_upper_bound(field: &str) -> String {
    format!("{field}{}{HIGH_SENTINEL}", shadow::SEPARATOR)
}

/// Prefix shared by every shadow key of `field` holding exactly `encoded`.
pub fn value_prefix(field: &str, encoded: &str) -> String {
    format!("{field}{}{encoded}{ID_SEGMENT}", shadow::SEPARATOR)
}

/// Sorts after every shadow key of `field` holding exactly `encoded`.
pub fn value_upper_bound(field: &str, encoded: &str) -> String {
    format!("{}{HIGH_SENTINEL}", value_prefix(field, encoded))
}

/// Id owning a shadow key.
///
/// Ids never contain the separator, so the last id segment is the real one even
/// when the encoded value contains `#id#`.
pub fn owner_id(sort_key: &str) -> Option<&str> {
    sort_key
        .rfind(ID_SEGMENT)
        .map(|index| &sort_key[index + ID_SEGMENT.len()..])
        .filter(|id| !id.is_empty())
}
