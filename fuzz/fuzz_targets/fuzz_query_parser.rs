#![no_main]

use libfuzzer_sys::fuzz_target;
use promptkit::query::parse_query;

fuzz_target!(|data: &str| {
    // Arbitrary input must yield a query or a parse error, never a panic
    if let Ok(query) = parse_query(data) {
        // Joiners always sit between filters
        assert_eq!(query.joiners.len(), query.filters.len().saturating_sub(1));
        let _ = query.requires_archived();
    }
});
