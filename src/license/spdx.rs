/// Canonical SPDX identifiers and the free-text names they are commonly written as.
const KNOWN_LICENSES: &[(&str, &[&str])] = &[
    (
        "Apache-2.0",
        &[
            "Apache 2.0",
            "Apache2",
            "Apache License 2.0",
            "Apache License, Version 2.0",
            "Apache Software License",
        ],
    ),
    ("MIT", &["MIT License", "The MIT License", "Expat"]),
    ("BSD-2-Clause", &["BSD 2-Clause", "Simplified BSD", "FreeBSD"]),
    (
        "BSD-3-Clause",
        &["BSD", "BSD License", "BSD 3-Clause", "New BSD", "Modified BSD"],
    ),
    ("ISC", &["ISC License"]),
    ("0BSD", &[]),
    ("Unlicense", &["The Unlicense"]),
    ("Zlib", &["zlib License"]),
    ("CC0-1.0", &["CC0", "Public Domain"]),
    ("MPL-2.0", &["Mozilla Public License 2.0", "MPL 2.0", "MPLv2"]),
    (
        "GPL-2.0",
        &["GNU GPL v2", "GNU General Public License v2", "GPL v2", "GPLv2"],
    ),
    (
        "GPL-3.0",
        &["GNU GPL v3", "GNU General Public License v3", "GPL v3", "GPLv3"],
    ),
    ("LGPL-2.1", &["GNU LGPL v2.1", "LGPL v2.1", "LGPLv2.1"]),
    ("LGPL-3.0", &["GNU LGPL v3", "LGPL v3", "LGPLv3"]),
    ("AGPL-3.0", &["AGPL v3", "AGPLv3", "GNU AGPL v3"]),
    ("EPL-2.0", &["Eclipse Public License 2.0"]),
    ("Python-2.0", &["Python Software Foundation License", "PSF"]),
    ("Ruby", &["Ruby License"]),
];

/// Resolve a free-text license name to its canonical SPDX identifier.
///
/// Matching ignores case and surrounding whitespace. Names that match no known
/// license are returned trimmed and otherwise unchanged, so custom identifiers
/// still compare equal to themselves.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    KNOWN_LICENSES
        .iter()
        .find(|(id, aliases)| {
            id.eq_ignore_ascii_case(trimmed)
                || aliases.iter().any(|a| a.eq_ignore_ascii_case(trimmed))
        })
        .map(|(id, _)| id.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}
