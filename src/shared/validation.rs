use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating slugs
    /// Must be lowercase alphanumeric with single hyphens between segments
    /// - Valid: "womens-shoes", "tops2024", "a-b-c"
    /// - Invalid: "-shoes", "shoes-", "mens--wear", "Shoes", "mens_wear"
    pub static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();

    /// Anything that is not a word character, whitespace or hyphen
    static ref NON_WORD_REGEX: Regex = Regex::new(r"[^a-z0-9_\s-]").unwrap();

    /// Runs of whitespace, underscores and hyphens
    static ref SEPARATOR_REGEX: Regex = Regex::new(r"[\s_-]+").unwrap();
}

/// Derive a URL-safe slug from a display name.
///
/// Latin diacritics are transliterated to ASCII, the result is lowercased,
/// punctuation is dropped and separator runs become a single hyphen.
/// Applying it to its own output returns the same string.
///
/// `"Men's Wear!!"` -> `"mens-wear"`, `"Crème Brûlée"` -> `"creme-brulee"`
pub fn slugify(name: &str) -> String {
    let mut ascii = String::with_capacity(name.len());
    for c in name.chars() {
        match transliterate(c) {
            Some(folded) => ascii.push_str(folded),
            None => ascii.push(c),
        }
    }
    let lowered = ascii.to_lowercase();
    let stripped = NON_WORD_REGEX.replace_all(&lowered, "");
    let hyphenated = SEPARATOR_REGEX.replace_all(&stripped, "-");
    hyphenated.trim_matches('-').to_string()
}

fn transliterate(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' => "A",
        'æ' => "ae",
        'Æ' => "AE",
        'ç' | 'ć' | 'č' => "c",
        'Ç' | 'Ć' | 'Č' => "C",
        'ď' | 'đ' | 'ð' => "d",
        'Ď' | 'Đ' | 'Ð' => "D",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ė' | 'Ę' | 'Ě' => "E",
        'ğ' => "g",
        'Ğ' => "G",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => "i",
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ī' | 'Į' | 'İ' => "I",
        'ł' => "l",
        'Ł' => "L",
        'ñ' | 'ń' | 'ň' => "n",
        'Ñ' | 'Ń' | 'Ň' => "N",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' | 'Ő' => "O",
        'œ' => "oe",
        'Œ' => "OE",
        'ř' => "r",
        'Ř' => "R",
        'ś' | 'š' | 'ş' => "s",
        'Ś' | 'Š' | 'Ş' => "S",
        'ß' => "ss",
        'ť' | 'ţ' => "t",
        'Ť' | 'Ţ' => "T",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => "u",
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ū' | 'Ů' | 'Ű' => "U",
        'ý' | 'ÿ' => "y",
        'Ý' | 'Ÿ' => "Y",
        'ź' | 'ż' | 'ž' => "z",
        'Ź' | 'Ż' | 'Ž' => "Z",
        '&' => " and ",
        _ => return None,
    };
    Some(folded)
}
