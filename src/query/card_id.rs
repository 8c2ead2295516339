use nom::bytes::complete::take_while1;
use nom::character::complete::char;
use nom::combinator::{all_consuming, opt};
use nom::multi::separated_list1;
use nom::{IResult, Parser};

fn segment(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric()).parse(input)
}

fn number(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_digit()).parse(input)
}

fn rarity_suffix(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphabetic()).parse(input)
}

/// Recognizes the printing-id grammar `<product>-<number><rarity>` where
/// the product is one or more alphanumeric segments joined by `/` and the
/// rarity suffix is optional (base ids omit it). Keywords in this shape
/// short-circuit to an exact identifier scan; fuzzy search over
/// structured ids produces junk matches.
pub fn is_card_id(input: &str) -> bool {
    all_consuming((
        separated_list1(char('/'), segment),
        char('-'),
        number,
        opt(rarity_suffix),
    ))
    .parse(input)
    .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_full_printing_ids() {
        assert!(is_card_id("BSF/S104-001"));
        assert!(is_card_id("BSF/S104-001R"));
        assert!(is_card_id("TST-045SR"));
    }

    #[test]
    fn accepts_base_ids_without_rarity() {
        assert!(is_card_id("TST-045"));
    }

    #[test]
    fn rejects_plain_keywords() {
        assert!(!is_card_id("sword"));
        assert!(!is_card_id("魔法少女"));
        assert!(!is_card_id("BSF/S104"));
        assert!(!is_card_id("BSF-"));
        assert!(!is_card_id("-001"));
        assert!(!is_card_id("TST-001 extra"));
    }
}
