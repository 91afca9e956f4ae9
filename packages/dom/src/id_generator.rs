use crc32fast::Hasher;

use crate::markers::GENERATED_PREFIX;
use crate::tree::Tree;

/// Generate a session seed from an arbitrary key (template id, session id) using CRC32
pub fn get_session_seed(key: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential generated-identity source for one editor session
///
/// Identities look like `mc-el-<seed>-<n>` and are used both as the element id
/// and as its class token.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String, // Session seed (CRC32)
    count: u32,   // Sequential counter
}

impl IdGenerator {
    pub fn new(key: &str) -> Self {
        Self {
            seed: get_session_seed(key),
            count: 0,
        }
    }

    pub fn from_seed(seed: String) -> Self {
        Self { seed, count: 0 }
    }

    /// Generate next sequential identity
    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("{}{}-{}", GENERATED_PREFIX, self.seed, self.count)
    }

    /// Next identity not already used by any element of `tree`
    ///
    /// Documents loaded from storage keep identities from earlier sessions,
    /// so a fresh counter can collide with them.
    pub fn next_identity(&mut self, tree: &Tree) -> String {
        loop {
            let candidate = self.new_id();
            if !tree.identity_in_use(&candidate) {
                return candidate;
            }
        }
    }

    /// Get session seed
    pub fn seed(&self) -> &str {
        &self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn test_session_seed_generation() {
        let id1 = get_session_seed("template-1");
        let id2 = get_session_seed("template-1");

        // Same key always generates same seed
        assert_eq!(id1, id2);

        // Different keys generate different seeds
        let id3 = get_session_seed("template-2");
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_sequential_ids() {
        let mut gen = IdGenerator::new("session");

        let id1 = gen.new_id();
        let id2 = gen.new_id();

        assert!(id1.starts_with(GENERATED_PREFIX));
        assert!(id1.ends_with("-1"));
        assert!(id2.ends_with("-2"));
        assert!(id1.contains(gen.seed()));
    }

    #[test]
    fn test_next_identity_skips_ids_in_document() {
        let mut gen = IdGenerator::from_seed("abc".to_string());
        let tree = parse(r#"<div class="mc-el-abc-1"></div><p id="mc-el-abc-2"></p>"#);

        assert_eq!(gen.next_identity(&tree), "mc-el-abc-3");
    }
}
