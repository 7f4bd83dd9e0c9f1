//! Interwiki language prefix set

use std::collections::HashSet;

use once_cell::sync::Lazy;

/// Language codes that appear as interwiki prefixes in `[[xx:Title]]` links.
///
/// Mirrors the set of Wikipedia language editions; a link whose prefix is
/// found here points at another language's copy of the article and is elided
/// from the output.
const LANGUAGE_CODES: &[&str] = &[
    "aa", "ab", "ace", "ady", "af", "ak", "als", "alt", "am", "ami", "an",
    "ang", "anp", "ar", "arc", "ary", "arz", "as", "ast", "atj", "av", "avk",
    "awa", "ay", "az", "azb", "ba", "ban", "bar", "bat-smg", "bbc", "bcl",
    "be", "be-tarask", "bg", "bh", "bi", "bjn", "blk", "bm", "bn", "bo",
    "bpy", "br", "bs", "bug", "bxr", "ca", "cbk-zam", "cdo", "ce", "ceb",
    "ch", "cho", "chr", "chy", "ckb", "co", "cr", "crh", "cs", "csb", "cu",
    "cv", "cy", "da", "dag", "de", "din", "diq", "dsb", "dty", "dv", "dz",
    "ee", "el", "eml", "en", "eo", "es", "et", "eu", "ext", "fa", "fat",
    "ff", "fi", "fiu-vro", "fj", "fo", "fon", "fr", "frp", "frr", "fur",
    "fy", "ga", "gag", "gan", "gcr", "gd", "gl", "glk", "gn", "gom", "gor",
    "got", "gpe", "gu", "guc", "gur", "guw", "gv", "ha", "hak", "haw", "he",
    "hi", "hif", "ho", "hr", "hsb", "ht", "hu", "hy", "hyw", "hz", "ia",
    "id", "ie", "ig", "ii", "ik", "ilo", "inh", "io", "is", "it", "iu",
    "ja", "jam", "jbo", "jv", "ka", "kaa", "kab", "kbd", "kbp", "kcg", "kg",
    "ki", "kj", "kk", "kl", "km", "kn", "ko", "koi", "kr", "krc", "ks",
    "ksh", "ku", "kv", "kw", "ky", "la", "lad", "lb", "lbe", "lez", "lfn",
    "lg", "li", "lij", "lld", "lmo", "ln", "lo", "lrc", "lt", "ltg", "lv",
    "mad", "mai", "map-bms", "mdf", "mg", "mh", "mhr", "mi", "min", "mk",
    "ml", "mn", "mni", "mnw", "mo", "mr", "mrj", "ms", "mt", "mus", "mwl",
    "my", "myv", "mzn", "na", "nah", "nap", "nds", "nds-nl", "ne", "new",
    "ng", "nia", "nl", "nn", "no", "nov", "nqo", "nrm", "nso", "nv", "ny",
    "oc", "olo", "om", "or", "os", "pa", "pag", "pam", "pap", "pcd", "pcm",
    "pdc", "pfl", "pi", "pih", "pl", "pms", "pnb", "pnt", "ps", "pt", "pwn",
    "qu", "rm", "rmy", "rn", "ro", "roa-rup", "roa-tara", "ru", "rue", "rw",
    "sa", "sah", "sat", "sc", "scn", "sco", "sd", "se", "sg", "sh", "shi",
    "shn", "si", "simple", "sk", "skr", "sl", "sm", "smn", "sn", "so", "sq",
    "sr", "srn", "ss", "st", "stq", "su", "sv", "sw", "szl", "szy", "ta",
    "tay", "tcy", "te", "tet", "tg", "th", "ti", "tk", "tl", "tn", "to",
    "tpi", "tr", "trv", "ts", "tt", "tum", "tw", "ty", "tyv", "udm", "ug",
    "uk", "ur", "uz", "ve", "vec", "vep", "vi", "vls", "vo", "wa", "war",
    "wo", "wuu", "xal", "xh", "xmf", "yi", "yo", "za", "zea", "zh",
    "zh-classical", "zh-hans", "zh-hant", "zh-min-nan", "zh-yue", "zu",
];

static LANGUAGES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| LANGUAGE_CODES.iter().copied().collect());

/// Check whether `prefix` is a known interwiki language code.
///
/// The comparison is case-sensitive and expects the caller to pass only the
/// part of the link before the first `:`.
pub fn is_language_prefix(prefix: &str) -> bool {
    LANGUAGES.contains(prefix)
}
