use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CACHE: RwLock<HashMap<String, Arc<Regex>>> = RwLock::new(HashMap::new());
}

/// A process-wide, lazily populated, append-only map from pattern text to
/// compiled regex. Entries are immutable after first insert, so a reader
/// never observes a partially-built `Regex`; callers that supply the same
/// pattern string repeatedly (pattern-table rows, the drop filter's
/// per-header predicates) pay the compilation cost once per process.
pub fn compiled(pattern: &str) -> Result<Arc<Regex>, regex::Error> {
    if let Some(re) = CACHE.read().unwrap().get(pattern) {
        return Ok(re.clone());
    }

    let compiled = Arc::new(Regex::new(pattern)?);
    CACHE
        .write()
        .unwrap()
        .entry(pattern.to_string())
        .or_insert_with(|| compiled.clone());
    Ok(compiled)
}
