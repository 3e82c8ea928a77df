//! Text preprocessing: repetition, macro, and synonym expansion.
//!
//! Preprocessing never fails. Malformed bracket or macro syntax degrades to
//! best-effort text and the sequence parser delivers the final verdict.
//!
//! Pipeline order: whitespace strip + lowercase, repetition expansion, macro
//! expansion, synonym expansion, then one more repetition pass so brackets
//! introduced by macro templates or synonyms expand too.

use crate::macros::{MacroKey, MacroSnapshot, MacroTable, SynonymTable};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// Stop expanding once a message grows past this size.
const MAX_EXPANDED_LEN: usize = 64 * 1024;

/// Upper bound on macro-in-macro expansion passes.
const MAX_MACRO_PASSES: usize = 10;

fn repetition_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\[([^\[\]]*)\]\*(\d{1,2})").expect("hard-coded pattern compiles")
    })
}

fn macro_candidate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"#[a-z0-9(,.]*").expect("hard-coded pattern compiles"))
}

/// Expand `[seq]*N` repetition groups, innermost-first.
///
/// `N` is limited to two digits; `N = 0` removes the group. The bracketed
/// body can contain no brackets itself, so every match is innermost and the
/// bracket count shrinks monotonically until no group is left.
pub fn expand_repetitions(message: &str) -> String {
    let mut message = message.to_string();

    while let Some(caps) = repetition_pattern().captures(&message) {
        let Some(whole) = caps.get(0) else { break };
        let body = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let count: usize = caps
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);

        let expanded = body.repeat(count);
        let next_len = message.len() - whole.as_str().len() + expanded.len();
        if next_len > MAX_EXPANDED_LEN {
            debug!("repetition expansion exceeds {MAX_EXPANDED_LEN} bytes, leaving message as-is");
            break;
        }

        let mut next = String::with_capacity(next_len);
        next.push_str(&message[..whole.start()]);
        next.push_str(&expanded);
        next.push_str(&message[whole.end()..]);
        message = next;
    }

    message
}

/// Recursively substitute macros, bounded at [`MAX_MACRO_PASSES`] passes.
///
/// Each pass substitutes every non-overlapping macro occurrence
/// left-to-right against one table snapshot, then re-scans so macros may
/// expand into other macros. Unknown candidates are left untouched.
pub fn expand_macros(message: &str, table: &MacroTable) -> String {
    let snapshot = table.snapshot();
    if snapshot.is_empty() {
        return message.to_string();
    }

    let mut message = message.to_string();
    for _ in 0..MAX_MACRO_PASSES {
        let subs = find_substitutions(&message, &snapshot);
        if subs.is_empty() {
            break;
        }

        let mut next = String::with_capacity(message.len());
        let mut cursor = 0;
        for sub in &subs {
            next.push_str(&message[cursor..sub.start]);
            next.push_str(&sub.replacement);
            cursor = sub.end;
        }
        next.push_str(&message[cursor..]);
        message = next;

        if message.len() > MAX_EXPANDED_LEN {
            debug!("macro expansion exceeds {MAX_EXPANDED_LEN} bytes, stopping early");
            break;
        }
    }

    message
}

/// One pending replacement within a pass. Spans never overlap: candidates
/// come from non-overlapping matches and a substitution extends past its
/// candidate only to swallow the `)` terminating an argument list.
struct Substitution {
    start: usize,
    end: usize,
    replacement: String,
}

fn find_substitutions(message: &str, snapshot: &MacroSnapshot) -> Vec<Substitution> {
    let mut subs = Vec::new();

    for candidate in macro_candidate_pattern().find_iter(message) {
        // A lone '#' is a wait input, not a macro.
        if candidate.as_str().len() < 2 {
            continue;
        }
        if let Some(sub) =
            resolve_candidate(message, candidate.start(), candidate.as_str(), snapshot)
        {
            subs.push(sub);
        }
    }

    subs
}

/// Resolve one `#...` candidate against the table.
///
/// Parameterized candidates try an exact `(name, arity)` match first, then
/// the bare `(name, 0)` macro (arguments dropped, as the original language
/// allowed). Failing both, the longest arity-0 prefix of the name is
/// substituted, leaving the remainder for the parser to judge.
fn resolve_candidate(
    message: &str,
    start: usize,
    text: &str,
    snapshot: &MacroSnapshot,
) -> Option<Substitution> {
    let (name, open) = match text.find('(') {
        Some(open) => (&text[..open], Some(open)),
        None => (text, None),
    };

    if let Some(open) = open {
        let end = start + text.len();
        // The candidate pattern stops just before ')', so a well-formed
        // argument list closes exactly at `end`.
        if name.len() >= 2 && message[end..].starts_with(')') {
            let args: Vec<&str> = text[open + 1..].split(',').collect();
            let exact = MacroKey {
                name: name.to_string(),
                arity: args.len(),
            };
            if let Some(template) = snapshot.get(&exact) {
                return Some(Substitution {
                    start,
                    end: end + 1,
                    replacement: fill_placeholders(template, &args),
                });
            }
            let bare = MacroKey {
                name: name.to_string(),
                arity: 0,
            };
            if let Some(template) = snapshot.get(&bare) {
                return Some(Substitution {
                    start,
                    end: end + 1,
                    replacement: template.clone(),
                });
            }
        }
    }

    longest_prefix_substitution(start, name, snapshot)
}

/// Longest-name priority for plain candidates: try the whole name, then
/// shrink one character at a time (a macro name is at least `#` + 1 char).
fn longest_prefix_substitution(
    start: usize,
    name: &str,
    snapshot: &MacroSnapshot,
) -> Option<Substitution> {
    for len in (2..=name.len()).rev() {
        let key = MacroKey {
            name: name[..len].to_string(),
            arity: 0,
        };
        if let Some(template) = snapshot.get(&key) {
            return Some(Substitution {
                start,
                end: start + len,
                replacement: template.clone(),
            });
        }
    }
    None
}

fn fill_placeholders(template: &str, args: &[&str]) -> String {
    let mut filled = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        filled = filled.replace(&format!("<{i}>"), arg);
    }
    filled
}

/// Apply every configured synonym as a plain substring replacement, in the
/// table's deterministic order.
pub fn expand_synonyms(message: &str, synonyms: &SynonymTable) -> String {
    let mut message = message.to_string();
    for (from, to) in synonyms.snapshot() {
        message = message.replace(&from, &to);
    }
    message
}

/// Full preprocessing pipeline for one raw message.
pub fn preprocess(message: &str, macros: &MacroTable, synonyms: &SynonymTable) -> String {
    let message: String = message
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    let message = expand_repetitions(&message);
    let message = expand_macros(&message, macros);
    let message = expand_synonyms(&message, synonyms);
    // Macro templates and synonyms may introduce repetition groups of
    // their own.
    expand_repetitions(&message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(defs: &[(&str, &str)]) -> MacroTable {
        MacroTable::from_defs(defs.iter().copied()).unwrap()
    }

    #[test]
    fn repetition_expands_to_literal_concatenation() {
        assert_eq!(expand_repetitions("[a100ms]*3"), "a100msa100msa100ms");
    }

    #[test]
    fn repetition_expands_innermost_first() {
        assert_eq!(expand_repetitions("[[a]*2b]*2"), "aabaab");
    }

    #[test]
    fn repetition_zero_removes_group() {
        assert_eq!(expand_repetitions("x[a]*0y"), "xy");
    }

    #[test]
    fn repetition_without_count_is_left_alone() {
        assert_eq!(expand_repetitions("[abc]"), "[abc]");
    }

    #[test]
    fn repetition_growth_is_capped() {
        // 99^4 copies would be ~100MB; expansion must stop early instead.
        let bomb = "[[[[a]*99]*99]*99]*99";
        let out = expand_repetitions(bomb);
        assert!(out.len() <= MAX_EXPANDED_LEN);
    }

    #[test]
    fn macro_expands_simple_name() {
        let t = table(&[("#jump", "left300msy")]);
        assert_eq!(expand_macros("#jump", &t), "left300msy");
    }

    #[test]
    fn macro_expansion_is_idempotent_on_expanded_text() {
        let t = table(&[("#jump", "left300msy")]);
        let once = expand_macros("#jump b", &t);
        assert_eq!(expand_macros(&once, &t), once);
    }

    #[test]
    fn macro_expands_into_other_macros() {
        let t = table(&[("#a", "#b"), ("#b", "x200ms")]);
        assert_eq!(expand_macros("#a", &t), "x200ms");
    }

    #[test]
    fn self_referential_macro_stops_at_pass_limit() {
        let t = table(&[("#loop", "#loop")]);
        assert_eq!(expand_macros("#loop", &t), "#loop");
    }

    #[test]
    fn parameterized_macro_fills_placeholders_in_order() {
        let t = table(&[("#mashalt(*,*)", "<0>34ms#17ms<1>100ms")]);
        assert_eq!(expand_macros("#mashalt(a,b)", &t), "a34ms#17msb100ms");
    }

    #[test]
    fn arity_selects_between_same_name_macros() {
        let t = table(&[("#mash(*)", "<0>1"), ("#mash(*,*)", "<0>2<1>2")]);
        assert_eq!(expand_macros("#mash(a)", &t), "a1");
        assert_eq!(expand_macros("#mash(a,b)", &t), "a2b2");
    }

    #[test]
    fn longest_macro_name_wins() {
        let t = table(&[("#m", "short"), ("#mash", "long")]);
        assert_eq!(expand_macros("#mash", &t), "long");
    }

    #[test]
    fn shorter_macro_substitutes_its_prefix_only() {
        let t = table(&[("#m", "b300ms")]);
        assert_eq!(expand_macros("#mx", &t), "b300msx");
    }

    #[test]
    fn unknown_macro_is_left_untouched() {
        let t = table(&[("#jump", "y")]);
        assert_eq!(expand_macros("#warp", &t), "#warp");
    }

    #[test]
    fn lone_sigil_is_not_a_macro() {
        let t = table(&[("#jump", "y")]);
        assert_eq!(expand_macros("a100ms#17ms", &t), "a100ms#17ms");
    }

    #[test]
    fn bare_macro_swallows_unused_argument_list() {
        let t = table(&[("#jump", "y")]);
        assert_eq!(expand_macros("#jump(a)", &t), "y");
    }

    #[test]
    fn multiple_occurrences_substitute_in_one_pass() {
        let t = table(&[("#j", "y")]);
        assert_eq!(expand_macros("#ja#jb", &t), "yayb");
    }

    #[test]
    fn synonyms_replace_substrings() {
        let synonyms = SynonymTable::from_pairs([("spinjump", "_b500msa")]);
        assert_eq!(expand_synonyms("spinjump", &synonyms), "_b500msa");
    }

    #[test]
    fn preprocess_runs_full_pipeline() {
        let macros = table(&[("#mash(*)", "[<0>17ms#17ms]*2")]);
        let synonyms = SynonymTable::new();
        assert_eq!(
            preprocess("#mash(A) B", &macros, &synonyms),
            "a17ms#17msa17ms#17msb"
        );
    }

    #[test]
    fn preprocess_strips_whitespace_and_lowercases() {
        let macros = MacroTable::new();
        let synonyms = SynonymTable::new();
        assert_eq!(preprocess(" A 300ms  B ", &macros, &synonyms), "a300msb");
    }

    #[test]
    fn concurrent_table_edits_never_tear_a_pass() {
        use std::sync::Arc;
        use std::thread;

        let table = Arc::new(table(&[("#jump", "left300msy")]));
        let mut handles = Vec::new();

        for _ in 0..4 {
            let table = Arc::clone(&table);
            handles.push(thread::spawn(move || {
                for _ in 0..250 {
                    let out = expand_macros("#jump", &table);
                    // Either definition, never a torn mix.
                    assert!(out == "left300msy" || out == "up100msb" || out == "#jump");
                }
            }));
        }

        let editor = Arc::clone(&table);
        handles.push(thread::spawn(move || {
            for i in 0..250 {
                if i % 2 == 0 {
                    editor.insert("#jump", "up100msb").unwrap();
                } else {
                    editor.insert("#jump", "left300msy").unwrap();
                }
            }
        }));

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
