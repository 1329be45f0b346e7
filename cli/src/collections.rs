//! Collection matching for `drop-collections`.
//!
//! Collection names in the wild drift from the canonical ones (`Reseñas`, `business-tips`,
//! `usuarios`), so names and targets are compared after folding both to a normal form.

/// Targets used when none are given on the command line.
pub const DEFAULT_TARGETS: [&str; 5] = ["checkin", "negocios", "reseñas", "tips", "usuario"];

/// Database never touched.
pub const SKIPPED_DATABASE: &str = "local";

/// Lower-cases, folds accents, removes `-`, `_` and whitespace, then strips one trailing `s`.
pub fn normalize_name(name: &str) -> String {
    let mut folded: String = name
        .chars()
        .flat_map(char::to_lowercase)
        .map(fold_accent)
        .filter(|c| !(*c == '-' || *c == '_' || c.is_whitespace()))
        .collect();
    if folded.ends_with('s') {
        folded.pop();
    }
    folded
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

/// Picks the collections of one database that match any target.
///
/// An exact normalised match wins; a target without one falls back to every collection
/// whose normalised name contains it or is contained in it. The result keeps first-seen
/// order and holds no duplicates.
pub fn plan_drops<S: AsRef<str>>(names: &[String], targets: &[S]) -> Vec<String> {
    let normalized: Vec<(String, &String)> =
        names.iter().map(|name| (normalize_name(name), name)).collect();
    let mut plan: Vec<String> = Vec::new();

    for target in targets {
        let target = normalize_name(target.as_ref());
        if target.is_empty() {
            continue;
        }
        let exact: Vec<&String> = normalized
            .iter()
            .filter(|(norm, _)| *norm == target)
            .map(|(_, name)| *name)
            .collect();
        let matches = if exact.is_empty() {
            normalized
                .iter()
                .filter(|(norm, _)| {
                    !norm.is_empty() && (norm.contains(&target) || target.contains(norm.as_str()))
                })
                .map(|(_, name)| *name)
                .collect()
        } else {
            exact
        };

        for name in matches {
            if !plan.contains(name) {
                plan.push(name.clone());
            }
        }
    }

    plan
}
