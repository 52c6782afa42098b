//! Content-derived identity: entity ids and the short hashes used as
//! cheap "did this change" predicates.

use xxhash_rust::xxh3::xxh3_64;

use crate::model::entity::EntityType;

/// First `len` hex chars of xxh3 over `input`.
fn short_hash(input: &[u8], len: usize) -> String {
    let full = format!("{:016x}", xxh3_64(input));
    full[..len].to_string()
}

/// Stable entity id: `sa-<kind>-<filehash6>-<name>`.
///
/// The file segment hashes the *path*, so an entity keeps its id when its
/// body moves within the file; renaming the file or the entity changes it.
pub fn entity_id(entity_type: EntityType, file_path: &str, name: &str) -> String {
    format!(
        "sa-{}-{}-{}",
        entity_type.as_str(),
        short_hash(file_path.as_bytes(), 6),
        name
    )
}

/// 8 hex chars over the signature string. Pure function of `signature`.
pub fn sig_hash(signature: &str) -> String {
    short_hash(signature.as_bytes(), 8)
}

/// 8 hex chars over the body bytes. Pure function of the body.
pub fn body_hash(body: &[u8]) -> String {
    short_hash(body, 8)
}

/// Content hash for whole files, used by the incremental file index.
pub fn file_hash(contents: &[u8]) -> String {
    format!("{:016x}", xxh3_64(contents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hashes_have_fixed_width() {
        assert_eq!(sig_hash("fn f()").len(), 8);
        assert_eq!(body_hash(b"body").len(), 8);
        assert_eq!(file_hash(b"contents").len(), 16);
    }

    proptest! {
        // Hash discipline: sig_hash is a pure function of the signature and
        // body_hash of the body bytes; doc-only differences change neither.
        #[test]
        fn sig_hash_is_deterministic(s in ".*") {
            prop_assert_eq!(sig_hash(&s), sig_hash(&s));
        }

        #[test]
        fn body_hash_is_deterministic(b in proptest::collection::vec(any::<u8>(), 0..256)) {
            prop_assert_eq!(body_hash(&b), body_hash(&b));
        }

        #[test]
        fn entity_id_is_deterministic(name in "[a-zA-Z_][a-zA-Z0-9_]{0,20}", path in "[a-z/]{1,30}") {
            let a = entity_id(EntityType::Function, &path, &name);
            let b = entity_id(EntityType::Function, &path, &name);
            prop_assert_eq!(a, b);
        }
    }
}
