//! Tolerant version ordering for release and tag names.
//!
//! Tag names in the wild are only loosely semver: `v1.2`, `1.2.0-rc1`,
//! `release-2024_01`, `nightly`. Rather than rejecting what does not parse,
//! every string is split into numeric and word parts and compared part by
//! part, so any two strings have a defined order.

use std::cmp::Ordering;

const RANK_DEV: u8 = 0;
const RANK_ALPHA: u8 = 1;
const RANK_BETA: u8 = 2;
const RANK_RC: u8 = 3;
const RANK_OTHER: u8 = 4;
/// Implicit rank of a version that ends where the other has a word part.
const RANK_RELEASE: u8 = 5;
const RANK_PATCH: u8 = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    /// Decimal digits with leading zeros stripped (`""` is zero).
    Num(String),
    Word(u8, String),
}

fn word_rank(word: &str) -> u8 {
    match word {
        "dev" => RANK_DEV,
        "alpha" | "a" => RANK_ALPHA,
        "beta" | "b" => RANK_BETA,
        "rc" | "c" | "pre" => RANK_RC,
        "patch" | "p" | "pl" => RANK_PATCH,
        _ => RANK_OTHER,
    }
}

fn parts(version: &str) -> Vec<Part> {
    let mut v = version.trim();
    if let Some(rest) = v.strip_prefix(['v', 'V']) {
        if rest.starts_with(|c: char| c.is_ascii_digit()) {
            v = rest;
        }
    }
    // Build metadata never affects precedence.
    let v = v.split('+').next().unwrap_or(v);

    let mut out = Vec::new();
    for chunk in v.split(['.', '-', '_']) {
        let mut rest = chunk;
        while let Some(first) = rest.chars().next() {
            let digits = first.is_ascii_digit();
            let end = rest
                .find(|c: char| c.is_ascii_digit() != digits)
                .unwrap_or(rest.len());
            let (run, tail) = rest.split_at(end);
            out.push(if digits {
                Part::Num(run.trim_start_matches('0').to_string())
            } else {
                let word = run.to_ascii_lowercase();
                Part::Word(word_rank(&word), word)
            });
            rest = tail;
        }
    }
    out
}

fn cmp_num(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn cmp_part(a: Option<&Part>, b: Option<&Part>) -> Ordering {
    match (a, b) {
        (Some(Part::Num(x)), Some(Part::Num(y))) => cmp_num(x, y),
        (Some(Part::Num(_)), Some(Part::Word(..))) => Ordering::Greater,
        (Some(Part::Word(..)), Some(Part::Num(_))) => Ordering::Less,
        (Some(Part::Word(ra, wa)), Some(Part::Word(rb, wb))) => {
            ra.cmp(rb).then_with(|| {
                if *ra == RANK_OTHER {
                    wa.cmp(wb)
                } else {
                    Ordering::Equal
                }
            })
        }
        (Some(Part::Num(x)), None) => cmp_num(x, ""),
        (None, Some(Part::Num(y))) => cmp_num("", y),
        (Some(Part::Word(r, _)), None) => r.cmp(&RANK_RELEASE),
        (None, Some(Part::Word(r, _))) => RANK_RELEASE.cmp(r),
        (None, None) => Ordering::Equal,
    }
}

/// Compare two version strings.
///
/// `Less` means `a` is older than `b`. Identical strings are always `Equal`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let pa = parts(a);
    let pb = parts(b);
    for i in 0..pa.len().max(pb.len()) {
        match cmp_part(pa.get(i), pb.get(i)) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering::{Equal, Greater, Less};

    #[test]
    fn numeric_parts_compare_numerically() {
        assert_eq!(compare_versions("1.2.0", "1.1.9"), Greater);
        assert_eq!(compare_versions("1.1.9", "1.2.0"), Less);
        assert_eq!(compare_versions("1.10.0", "1.9.0"), Greater);
        assert_eq!(compare_versions("1.2.0", "1.2.0"), Equal);
    }

    #[test]
    fn v_prefix_and_trailing_zeros_are_ignored() {
        assert_eq!(compare_versions("v1.2.0", "1.2.0"), Equal);
        assert_eq!(compare_versions("1.0", "1.0.0"), Equal);
        assert_eq!(compare_versions("V2", "v1.9.9"), Greater);
    }

    #[test]
    fn prereleases_sort_before_release() {
        assert_eq!(compare_versions("1.0.0-rc1", "1.0.0"), Less);
        assert_eq!(compare_versions("1.0.0-alpha", "1.0.0-beta"), Less);
        assert_eq!(compare_versions("1.0.0-beta.2", "1.0.0-rc.1"), Less);
        assert_eq!(compare_versions("1.0.0-rc.2", "1.0.0-rc.10"), Less);
        assert_eq!(compare_versions("1.0.0-dev", "1.0.0-alpha"), Less);
        assert_eq!(compare_versions("1.0.0-p1", "1.0.0"), Greater);
    }

    #[test]
    fn build_metadata_is_ignored() {
        assert_eq!(compare_versions("1.0.0+build.5", "1.0.0+build.7"), Equal);
    }

    #[test]
    fn huge_numbers_do_not_overflow() {
        assert_eq!(
            compare_versions("1.99999999999999999999999", "1.100000000000000000000000"),
            Less
        );
        assert_eq!(compare_versions("1.007", "1.7"), Equal);
    }

    #[test]
    fn malformed_strings_still_have_an_order() {
        assert_eq!(compare_versions("nightly", "1.0"), Less);
        assert_eq!(compare_versions("nightly", "stable"), Less);
        assert_eq!(compare_versions("release-2024_02", "release-2024_01"), Greater);
        assert_eq!(compare_versions("", "0.0.1"), Less);
        assert_eq!(compare_versions("latest", "latest"), Equal);
    }

    #[test]
    fn ordering_is_antisymmetric() {
        let samples = ["1.0", "1.0.1", "1.0-rc1", "v2", "nightly", "2.0.0-beta", ""];
        for a in samples {
            for b in samples {
                assert_eq!(
                    compare_versions(a, b),
                    compare_versions(b, a).reverse(),
                    "{a} vs {b}"
                );
            }
        }
    }
}
