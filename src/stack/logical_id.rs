//! Template logical ids derived from construct paths.
//!
//! A logical id is the alphanumeric characters of the path components,
//! concatenated, followed by the first eight upper-case hex digits of the MD5
//! digest of the `/`-joined path. The suffix keeps ids unique when two paths
//! collapse to the same human-readable part.
//!
//! Each declaration's primary resource lives at `<path>/Resource`. `Resource`
//! is left out of the readable part but still hashed, and `Default` is
//! dropped everywhere. A component already ending the previous one is also
//! left out of the readable part, so `Alb/AlbListener` reads `AlbListener`.

/// Id of a declaration's primary resource, below its construct path.
pub const PRIMARY_ID: &str = "Resource";

/// Path component removed from both the readable part and the hash.
const HIDDEN_ID: &str = "Default";

/// Longest human-readable prefix kept before the hash suffix.
const MAX_HUMAN_LEN: usize = 240;

/// Longest id a single top-level component may use without a suffix.
const MAX_ID_LEN: usize = 255;

/// Length of the hash suffix.
const HASH_LEN: usize = 8;

/// Logical id for a construct path relative to its stack.
pub fn logical_id(path: &str) -> String {
    let components: Vec<&str> = path
        .split('/')
        .filter(|c| !c.is_empty() && *c != HIDDEN_ID)
        .collect();

    if let [single] = components.as_slice() {
        let candidate = alphanumeric(single);
        if candidate.len() <= MAX_ID_LEN {
            return candidate;
        }
    }

    let mut human = String::new();
    let mut previous: Option<&str> = None;
    for component in &components {
        let repeated = previous.is_some_and(|p| p.ends_with(component));
        if !repeated {
            previous = Some(component);
            if *component != PRIMARY_ID {
                human.push_str(&alphanumeric(component));
            }
        }
    }
    human.truncate(MAX_HUMAN_LEN);

    let digest = format!("{:X}", md5::compute(components.join("/").as_bytes()));
    format!("{}{}", human, &digest[..HASH_LEN])
}

/// Logical id of the primary resource of the construct at `path`.
pub fn resource_logical_id(path: &str) -> String {
    logical_id(&format!("{}/{}", path, PRIMARY_ID))
}

fn alphanumeric(component: &str) -> String {
    component
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Whether `id` is usable as a single construct path component.
pub fn is_valid_construct_id(id: &str) -> bool {
    !id.is_empty()
        && !id.contains('/')
        && id.chars().any(|c| c.is_ascii_alphanumeric())
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
