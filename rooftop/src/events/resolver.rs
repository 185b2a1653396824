//! Symbolic event query resolution.

use crate::domain::ResolveError;
use crate::events::checker::{query_string, register_from_output, EventChecker, NO_UMASK};
use crate::events::dump::EventDump;
use log::warn;
use std::collections::BTreeSet;

/// A requested event, optionally qualified by a sub-mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub event: String,
    pub umask: Option<String>,
}

impl EventQuery {
    /// Parse `EVT` or `EVT:MASK`.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        match query.split_once(':') {
            Some((event, umask)) => {
                Self { event: event.to_string(), umask: Some(umask.to_string()) }
            }
            None => Self { event: query.to_string(), umask: None },
        }
    }
}

/// One resolved counter. Field order drives the derived ordering:
/// reports sort by `(event, umask)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RegisterMapping {
    pub event: String,
    pub umask: String,
    pub register: String,
    pub description: String,
}

impl RegisterMapping {
    /// `EVT:MASK` form for display.
    #[must_use]
    pub fn query(&self) -> String {
        query_string(&self.event, Some(&self.umask))
    }
}

/// Resolve a set of queries against the dump through the checking tool.
///
/// An unqualified query expands to every sub-mask of the event; a qualified
/// query resolves only the named mask; an event with no sub-masks resolves
/// exactly once with the [`NO_UMASK`] sentinel. A missing event, a failing
/// check, or an unrecognized response skips that candidate with a
/// diagnostic and resolution proceeds; partial results are the expected
/// outcome on machines where some counters are unavailable.
///
/// The result is deduplicated and sorted by `(event, umask)`.
#[must_use]
pub fn resolve(
    dump: &EventDump,
    queries: &[EventQuery],
    checker: &dyn EventChecker,
) -> Vec<RegisterMapping> {
    let mut resolved = BTreeSet::new();
    for query in queries {
        for mapping in resolve_one(dump, query, checker) {
            resolved.insert(mapping);
        }
    }
    resolved.into_iter().collect()
}

fn resolve_one(
    dump: &EventDump,
    query: &EventQuery,
    checker: &dyn EventChecker,
) -> Vec<RegisterMapping> {
    let candidates = match candidates_for(dump, query) {
        Ok(candidates) => candidates,
        Err(err) => {
            warn!("Can not find HW event {}, skip it ({err})", query.event);
            return Vec::new();
        }
    };

    let mut mappings = Vec::new();
    for (umask, description) in candidates {
        let arg = if umask == NO_UMASK { None } else { Some(umask.as_str()) };
        let output = match checker.check(&query.event, arg) {
            Ok(output) => output,
            Err(err) => {
                warn!("Can not check HW event {}/{umask}, skip it ({err})", query.event);
                continue;
            }
        };
        let register = match register_from_output(&output) {
            Ok(register) => register,
            Err(err) => {
                warn!("Can not get HW event code {}/{umask}, skip it ({err})", query.event);
                continue;
            }
        };
        mappings.push(RegisterMapping {
            event: query.event.clone(),
            umask,
            register,
            description,
        });
    }
    mappings
}

/// Candidate `(umask, description)` pairs for one query.
fn candidates_for(
    dump: &EventDump,
    query: &EventQuery,
) -> Result<Vec<(String, String)>, ResolveError> {
    let block = dump
        .find(&query.event)
        .ok_or_else(|| ResolveError::EventNotFound(query.event.clone()))?;
    match &query.umask {
        Some(umask) => {
            let found: Vec<(String, String)> = block
                .umasks
                .iter()
                .filter(|entry| entry.name == *umask)
                .map(|entry| (entry.name.clone(), entry.description.clone()))
                .collect();
            if found.is_empty() {
                return Err(ResolveError::UmaskNotFound {
                    event: query.event.clone(),
                    umask: umask.clone(),
                });
            }
            Ok(found)
        }
        None if block.umasks.is_empty() => {
            Ok(vec![(NO_UMASK.to_string(), NO_UMASK.to_string())])
        }
        None => Ok(block
            .umasks
            .iter()
            .map(|entry| (entry.name.clone(), entry.description.clone()))
            .collect()),
    }
}

/// Append the `:u` user-space modifier to every entry that does not
/// already carry it. Applied both to raw profiler event names and to
/// resolved registers before they are handed to the profiler.
pub fn with_user_modifier(events: &mut [String]) {
    for event in events {
        if !event.ends_with(":u") {
            event.push_str(":u");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    const DUMP: &str = "\
Name : EVT
Umask-00 : M1 : first mask
Umask-01 : M2 : second mask
#-----------------------------
Name : BARE
#-----------------------------
Name : BROKEN
Umask-00 : M1 : unavailable
#-----------------------------
Name : NOISY
Umask-00 : M1 : garbled tool output
#-----------------------------
";

    /// Checker double recording every query it sees.
    struct FakeChecker {
        calls: RefCell<Vec<String>>,
    }

    impl FakeChecker {
        fn new() -> Self {
            Self { calls: RefCell::new(Vec::new()) }
        }
    }

    impl EventChecker for FakeChecker {
        fn check(&self, event: &str, umask: Option<&str>) -> Result<String, ResolveError> {
            let query = query_string(event, umask);
            self.calls.borrow_mut().push(query.clone());
            if event == "BROKEN" {
                return Err(ResolveError::CheckFailed {
                    query,
                    reason: "exit status 1".to_string(),
                });
            }
            if event == "NOISY" {
                return Ok("cannot encode event\n".to_string());
            }
            let code = match umask {
                Some("M1") => "0x5301",
                Some("M2") => "0x5302",
                _ => "0x5300",
            };
            Ok(format!("Codes : {code}\n"))
        }
    }

    #[test]
    fn test_unqualified_query_expands_to_all_masks() {
        let dump = EventDump::parse(DUMP);
        let checker = FakeChecker::new();
        let mappings = resolve(&dump, &[EventQuery::parse("EVT")], &checker);

        let queries: Vec<String> = mappings.iter().map(RegisterMapping::query).collect();
        assert_eq!(queries, vec!["EVT:M1", "EVT:M2"]);
        assert_eq!(mappings[0].register, "r5301");
        assert_eq!(mappings[1].register, "r5302");
    }

    #[test]
    fn test_qualified_query_resolves_single_mask() {
        let dump = EventDump::parse(DUMP);
        let checker = FakeChecker::new();
        let mappings = resolve(&dump, &[EventQuery::parse("EVT:M1")], &checker);
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].umask, "M1");
        assert_eq!(mappings[0].description, "first mask");
    }

    #[test]
    fn test_maskless_event_resolves_once_with_sentinel() {
        let dump = EventDump::parse(DUMP);
        let checker = FakeChecker::new();
        let mappings = resolve(&dump, &[EventQuery::parse("BARE")], &checker);
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].umask, NO_UMASK);
        assert_eq!(checker.calls.borrow().as_slice(), ["BARE"]);
    }

    #[test]
    fn test_missing_event_is_skipped_not_fatal() {
        let dump = EventDump::parse(DUMP);
        let checker = FakeChecker::new();
        let mappings =
            resolve(&dump, &[EventQuery::parse("NOPE"), EventQuery::parse("EVT:M2")], &checker);
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].umask, "M2");
    }

    #[test]
    fn test_failing_check_skips_only_that_event() {
        let dump = EventDump::parse(DUMP);
        let checker = FakeChecker::new();
        let mappings =
            resolve(&dump, &[EventQuery::parse("BROKEN"), EventQuery::parse("BARE")], &checker);
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].event, "BARE");
    }

    #[test]
    fn test_duplicate_queries_deduplicate() {
        let dump = EventDump::parse(DUMP);
        let checker = FakeChecker::new();
        let mappings =
            resolve(&dump, &[EventQuery::parse("EVT:M1"), EventQuery::parse("EVT")], &checker);
        assert_eq!(mappings.len(), 2);
    }

    #[test]
    fn test_unknown_umask_is_skipped() {
        let dump = EventDump::parse(DUMP);
        let checker = FakeChecker::new();
        let mappings = resolve(&dump, &[EventQuery::parse("EVT:M9")], &checker);
        assert!(mappings.is_empty());
        assert!(checker.calls.borrow().is_empty());
    }

    #[test]
    fn test_candidate_errors_classify_the_failure() {
        let dump = EventDump::parse(DUMP);
        let err = candidates_for(&dump, &EventQuery::parse("NOPE")).unwrap_err();
        assert!(matches!(err, ResolveError::EventNotFound(event) if event == "NOPE"));

        let err = candidates_for(&dump, &EventQuery::parse("EVT:M9")).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::UmaskNotFound { event, umask } if event == "EVT" && umask == "M9"
        ));
    }

    #[test]
    fn test_unrecognized_tool_response_skips_that_event() {
        let dump = EventDump::parse(DUMP);
        let checker = FakeChecker::new();
        let mappings =
            resolve(&dump, &[EventQuery::parse("NOISY"), EventQuery::parse("BARE")], &checker);
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].event, "BARE");
        // The tool was consulted; its answer was rejected
        assert!(checker.calls.borrow().contains(&"NOISY:M1".to_string()));
    }

    #[test]
    fn test_user_modifier_is_idempotent() {
        let mut events = vec!["r5301".to_string(), "cycles:u".to_string()];
        with_user_modifier(&mut events);
        assert_eq!(events, vec!["r5301:u", "cycles:u"]);
    }
}
