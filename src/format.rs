//! French-locale formatting and simulator helpers
//!
//! Output matches what `Intl.NumberFormat("fr-FR")` renders in the web client:
//! narrow no-break spaces between digit groups, a no-break space before `€`.

use chrono::NaiveDate;

/// Digit group separator (U+202F)
pub const GROUP_SEPARATOR: char = '\u{202f}';
/// Space before a currency symbol (U+00A0)
pub const CURRENCY_SPACE: char = '\u{a0}';

fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3 * 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(GROUP_SEPARATOR);
        }
        out.push(c);
    }
    out
}

/// Fixed-point rendering with French separators
fn format_fixed(value: f64, decimals: usize, trim_zeros: bool) -> String {
    let raw = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i, f),
        None => (raw.as_str(), ""),
    };
    let frac_part = if trim_zeros {
        frac_part.trim_end_matches('0')
    } else {
        frac_part
    };

    let mut out = String::new();
    let is_zero = int_part.chars().all(|c| c == '0') && frac_part.chars().all(|c| c == '0');
    if value < 0.0 && !is_zero {
        out.push('-');
    }
    out.push_str(&group_digits(int_part));
    if !frac_part.is_empty() {
        out.push(',');
        out.push_str(frac_part);
    }
    out
}

const COMPACT_UNITS: [(f64, &str); 3] = [(1e9, "Md"), (1e6, "M"), (1e3, "k")];

/// Value rounded for the short compact notation, with its suffix.
///
/// Below 10 units one decimal is kept when `keep_fraction` is set, which gives
/// the two significant digits of `Intl` compact output (`1,5 k`). Rounding that
/// reaches 1000 moves up to the next unit (`999 600` is `1 M`).
fn compact_round(value: f64, keep_fraction: bool) -> (f64, &'static str) {
    let (unit, suffix) = COMPACT_UNITS
        .iter()
        .copied()
        .find(|(unit, _)| value.abs() >= *unit)
        .unwrap_or((1.0, ""));

    let rounded = if keep_fraction && value.abs() / unit < 10.0 {
        // Divide by the tenth directly so 1150 gives 11.5 tenths, not 11.4999
        (value / (unit / 10.0)).round() / 10.0
    } else {
        (value / unit).round()
    };

    if rounded.abs() >= 1000.0 && suffix != "Md" {
        return compact_round(rounded * unit, keep_fraction);
    }
    (rounded, suffix)
}

/// Euros without decimals, e.g. `25 000 €` or, compact, `25 k€`
pub fn format_currency(value: f64, compact: bool) -> String {
    if compact {
        let (rounded, suffix) = compact_round(value, false);
        return format!(
            "{}{}{}€",
            format_fixed(rounded, 0, false),
            CURRENCY_SPACE,
            suffix
        );
    }
    format!("{}{}€", format_fixed(value.round(), 0, false), CURRENCY_SPACE)
}

/// A value already expressed in percent, e.g. `4,5 %`
pub fn format_percentage(value: f64, decimals: usize) -> String {
    format!("{}{}%", format_fixed(value, decimals, false), GROUP_SEPARATOR)
}

/// Plain number with up to three decimals, or compact `25 k`, `1,5 k`
pub fn format_number(value: f64, compact: bool) -> String {
    if compact {
        let (rounded, suffix) = compact_round(value, true);
        let number = format_fixed(rounded, 1, true);
        if suffix.is_empty() {
            return number;
        }
        return format!("{}{}{}", number, CURRENCY_SPACE, suffix);
    }
    format_fixed(value, 3, true)
}

/// Whole shares an amount buys
pub fn calculate_shares(amount: f64, price_per_share: f64) -> u64 {
    if price_per_share <= 0.0 || amount <= 0.0 {
        return 0;
    }
    (amount / price_per_share).floor() as u64
}

/// Nearest multiple of the share price, halves to the even share count
pub fn round_to_share_price(amount: f64, price_per_share: f64) -> f64 {
    if price_per_share <= 0.0 {
        return amount;
    }
    (amount / price_per_share).round_ties_even() * price_per_share
}

pub fn validate_minimum_investment(amount: f64, minimum: f64) -> bool {
    amount >= minimum
}

/// `principal × (1 + rate/frequency)^(frequency × years)`
pub fn compound_interest(principal: f64, rate: f64, years: u32, frequency: u32) -> f64 {
    let frequency = frequency.max(1) as f64;
    principal * (1.0 + rate / frequency).powf(frequency * years as f64)
}

pub fn year_range(min: u32, max: u32) -> Vec<u32> {
    (min..=max).collect()
}

fn fold_accent(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "A",
        'æ' => "ae",
        'Æ' => "AE",
        'ç' => "c",
        'Ç' => "C",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'È' | 'É' | 'Ê' | 'Ë' => "E",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'Ì' | 'Í' | 'Î' | 'Ï' => "I",
        'ñ' => "n",
        'Ñ' => "N",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => "o",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => "O",
        'œ' => "oe",
        'Œ' => "OE",
        'ù' | 'ú' | 'û' | 'ü' => "u",
        'Ù' | 'Ú' | 'Û' | 'Ü' => "U",
        'ý' | 'ÿ' => "y",
        'Ý' | 'Ÿ' => "Y",
        _ => return None,
    };
    Some(folded)
}

/// ASCII, lowercase, underscore-separated file stem
pub fn slugify_filename(input: &str) -> String {
    let mut kept = String::with_capacity(input.len());
    for c in input.chars() {
        if let Some(folded) = fold_accent(c) {
            kept.push_str(folded);
        } else if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c.is_whitespace() {
            kept.push(c);
        }
    }

    let mut slug = String::with_capacity(kept.len());
    for c in kept.chars() {
        let c = if c.is_whitespace() { '_' } else { c };
        if c == '_' && slug.ends_with('_') {
            continue;
        }
        slug.push(c);
    }

    slug.trim_matches('_').to_lowercase()
}

/// Slugified `base` with a single `.ext` extension
pub fn clean_filename(base: &str, ext: &str) -> String {
    let ext = ext.trim_start_matches('.').to_lowercase();
    let mut slug = slugify_filename(base);

    let redundant = [ext.as_str(), "docx", "pdf", "xlsx", "txt"];
    if let Some(suffix) = redundant
        .iter()
        .find(|s| !s.is_empty() && slug.ends_with(*s))
    {
        slug.truncate(slug.len() - suffix.len());
        if slug.ends_with('_') {
            slug.pop();
        }
    }

    format!("{}.{}", slug, ext)
}

/// Export name such as `simulation_scpi_comete_25000e_8ans_2025-01-07.pdf`
pub fn simulation_filename(
    scpi_name: &str,
    amount: f64,
    duration_years: u32,
    date: NaiveDate,
    ext: &str,
) -> String {
    let base = format!(
        "simulation_scpi_{}_{}e_{}ans_{}",
        scpi_name,
        amount.round() as i64,
        duration_years,
        date.format("%Y-%m-%d")
    );
    clean_filename(&base, ext)
}
