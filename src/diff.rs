use similar::{ChangeTag, TextDiff};

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Lines that were inserted into or removed from the listing, in diff order.
pub fn structural_changes(old: &str, new: &str) -> Vec<(ChangeTag, String)> {
    // A missing final newline would otherwise count as a changed last line.
    let old = with_final_newline(old);
    let new = with_final_newline(new);
    let diff = TextDiff::configure()
        .algorithm(similar::Algorithm::Myers)
        .diff_lines(old.as_str(), new.as_str());

    diff.iter_all_changes()
        .filter(|change| change.tag() != ChangeTag::Equal)
        .map(|change| {
            let line = change.value().trim_end_matches(['\r', '\n']).to_string();
            (change.tag(), line)
        })
        .collect()
}

fn with_final_newline(text: &str) -> String {
    let mut owned = text.replace("\r\n", "\n");
    if !owned.is_empty() && !owned.ends_with('\n') {
        owned.push('\n');
    }
    owned
}

pub fn print_structural_changes(old: &str, new: &str, colorize: bool) {
    let changes = structural_changes(old, new);
    if changes.is_empty() {
        return;
    }
    println!("listing changes:");
    for (tag, line) in changes {
        let (marker, color) = match tag {
            ChangeTag::Delete => ("-", RED),
            ChangeTag::Insert => ("+", GREEN),
            ChangeTag::Equal => continue,
        };
        if colorize {
            println!("{color}{marker} {line}{RESET}");
        } else {
            println!("{marker} {line}");
        }
    }
}
