use crate::{bits::BitChannel, errors::TitleError, format::RoomSchema};
use smallvec::SmallVec;

pub const MAX_TITLE_LEN: usize = 32;
/// Extended titles carry their token count in a 5 bit `count - 1` field.
pub const MAX_TITLE_TOKENS: usize = 32;

const TOKEN_BITS: u32 = 5;
const CAPITALISE: u8 = 0x1a;
const APOSTROPHE: u8 = 0x1b;
// end of title in classic records, a full stop in extended ones
const END_OR_STOP: u8 = 0x1c;
const SPACE: u8 = 0x1d;
const SPACE_CAPITALISE: u8 = 0x1e;
const THE: u8 = 0x1f;

type Tokens = SmallVec<[u8; 0x40]>;

/// Turn a title into tokens.
///
/// Classic tokens end with the end token. Extended tokens have no terminator
/// and may use `$1c` for a full stop instead.
///
/// The encoder tracks the decoder's capitalise flag so that every token it
/// picks decodes to exactly the input text.
pub fn tokenize(text: &str, schema: RoomSchema) -> Result<Tokens, TitleError> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() > MAX_TITLE_LEN {
        return Err(TitleError::TooLong(chars.len()));
    }

    let mut tokens = Tokens::new();
    let mut upper_next = true;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some(word) = chars.get(i..i + 3) {
            let upper = word == ['T', 'h', 'e'];
            if upper || word == ['t', 'h', 'e'] {
                if upper && !upper_next {
                    tokens.push(CAPITALISE);
                } else if !upper && upper_next {
                    return Err(TitleError::Capitalisation {
                        ch: c,
                        pos: i,
                        expected: "upper case",
                    });
                }
                tokens.push(THE);
                upper_next = false;
                i += 3;
                continue;
            }
        }

        match c {
            'a'..='z' => {
                if upper_next {
                    return Err(TitleError::Capitalisation {
                        ch: c,
                        pos: i,
                        expected: "upper case",
                    });
                }
                tokens.push(c as u8 - b'a');
            }
            'A'..='Z' => {
                if !upper_next {
                    tokens.push(CAPITALISE);
                }
                tokens.push(c as u8 - b'A');
                upper_next = false;
            }
            '\'' => tokens.push(APOSTROPHE),
            '.' if schema == RoomSchema::Extended => tokens.push(END_OR_STOP),
            ' ' => {
                let next_upper = chars
                    .get(i + 1)
                    .map_or(false, |n| n.is_ascii_uppercase());
                if next_upper {
                    tokens.push(SPACE_CAPITALISE);
                    upper_next = true;
                } else {
                    tokens.push(SPACE);
                }
            }
            _ => return Err(TitleError::Unsupported { ch: c, pos: i }),
        }
        i += 1;
    }

    if schema == RoomSchema::Classic {
        tokens.push(END_OR_STOP);
    }
    Ok(tokens)
}

/// The decoder side of the title codec: one capitalise flag and the text so far.
struct TitleDecoder {
    schema: RoomSchema,
    text: String,
    upper_next: bool,
}

impl TitleDecoder {
    fn new(schema: RoomSchema) -> Self {
        Self {
            schema,
            text: String::with_capacity(MAX_TITLE_LEN),
            upper_next: true,
        }
    }

    /// Apply one token. Returns `true` at the classic end token.
    fn feed(&mut self, token: u8) -> Result<bool, TitleError> {
        match token {
            0..=25 => {
                let base = if self.upper_next { b'A' } else { b'a' };
                self.text.push((base + token) as char);
                self.upper_next = false;
            }
            CAPITALISE => self.upper_next = true,
            APOSTROPHE => self.text.push('\''),
            END_OR_STOP => match self.schema {
                RoomSchema::Classic => return Ok(true),
                RoomSchema::Extended => self.text.push('.'),
            },
            SPACE => self.text.push(' '),
            SPACE_CAPITALISE => {
                self.text.push(' ');
                self.upper_next = true;
            }
            THE => {
                self.text.push_str(if self.upper_next { "The" } else { "the" });
                self.upper_next = false;
            }
            _ => return Err(TitleError::BadToken(token)),
        }

        if self.text.len() > MAX_TITLE_LEN {
            Err(TitleError::Overrun)
        } else {
            Ok(false)
        }
    }
}

/// Rebuild a title from its tokens.
///
/// Classic tokens after the end token are ignored, and a classic title with
/// no end token is an error. Every extended token is part of the title.
pub fn detokenize(tokens: &[u8], schema: RoomSchema) -> Result<String, TitleError> {
    let mut decoder = TitleDecoder::new(schema);
    for &token in tokens {
        if decoder.feed(token)? {
            return Ok(decoder.text);
        }
    }
    match schema {
        RoomSchema::Classic => Err(TitleError::Overrun),
        RoomSchema::Extended => Ok(decoder.text),
    }
}

pub fn write_title(bits: &mut BitChannel, text: &str, schema: RoomSchema) -> Result<(), TitleError> {
    let tokens = tokenize(text, schema)?;
    if schema == RoomSchema::Extended {
        if tokens.is_empty() {
            return Err(TitleError::Empty);
        }
        if tokens.len() > MAX_TITLE_TOKENS {
            return Err(TitleError::TooManyTokens(tokens.len()));
        }
        bits.push_field("title length", TOKEN_BITS, tokens.len() as u32 - 1)?;
    }
    for token in tokens {
        bits.push_field("title", TOKEN_BITS, token as u32)?;
    }
    Ok(())
}

/// Read a title: up to the end token in classic records, or the counted
/// tokens in extended ones.
///
/// Fails as soon as the text grows past [`MAX_TITLE_LEN`] characters, rather
/// than reading on into the following fields.
pub fn read_title(bits: &mut BitChannel, schema: RoomSchema) -> Result<String, TitleError> {
    let mut decoder = TitleDecoder::new(schema);
    match schema {
        RoomSchema::Classic => loop {
            let token = bits.pop_u8("title", TOKEN_BITS)?;
            if decoder.feed(token)? {
                return Ok(decoder.text);
            }
        },
        RoomSchema::Extended => {
            let count = bits.pop_u8("title length", TOKEN_BITS)? + 1;
            for _ in 0..count {
                let token = bits.pop_u8("title", TOKEN_BITS)?;
                decoder.feed(token)?;
            }
            Ok(decoder.text)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SCHEMAS: [RoomSchema; 2] = [RoomSchema::Classic, RoomSchema::Extended];

    fn round_trip(text: &str, schema: RoomSchema) -> Result<String, TitleError> {
        let mut bits = BitChannel::new();
        write_title(&mut bits, text, schema)?;
        bits.flush_to_byte_boundary();
        read_title(&mut bits, schema)
    }

    #[test]
    fn the_bathroom() -> Result<(), TitleError> {
        let tokens = tokenize("The Bathroom", RoomSchema::Classic)?;
        assert_eq!(tokens[0], THE);
        assert_eq!(tokens[1], SPACE_CAPITALISE);
        assert_eq!(tokens[2], b'B' - b'A');
        assert_eq!(*tokens.last().unwrap(), END_OR_STOP);
        assert_eq!(tokens.len(), 11);

        let extended = tokenize("The Bathroom", RoomSchema::Extended)?;
        assert_eq!(&extended[..], &tokens[..10]);

        for &schema in &SCHEMAS {
            assert_eq!(round_trip("The Bathroom", schema)?, "The Bathroom");
        }
        Ok(())
    }

    #[test]
    fn titles_round_trip() -> Result<(), TitleError> {
        let titles = [
            "Under the Drive",
            "Ballroom East",
            "Nomen Luni",
            "We must perform a Quirkafleeg",
            "Emergency Generator",
            "Rescue Esmerelda",
            "Watch Tower",
            "Willy's Bedroom",
            "Up the Stairs",
            "Cold Store",
            "The Off Licence",
            "On the Roof",
            "Entrance to Hades",
            "A  Gap",
            "Ship's Hold  ",
            "Other",
            "Tree Top",
            "Breathe",
            "AtThe end",
        ];
        for &schema in &SCHEMAS {
            for title in &titles {
                assert_eq!(round_trip(title, schema)?, *title);
            }
        }
        assert_eq!(round_trip("", RoomSchema::Classic)?, "");
        Ok(())
    }

    #[test]
    fn extended_titles_are_counted() -> Result<(), TitleError> {
        let mut bits = BitChannel::new();
        write_title(&mut bits, "Hall", RoomSchema::Extended)?;
        assert_eq!(bits.bit_len(), 5 * 5);
        assert_eq!(bits.pop_bits(5).unwrap(), 3);

        assert_eq!(
            write_title(&mut BitChannel::new(), "", RoomSchema::Extended),
            Err(TitleError::Empty)
        );
        Ok(())
    }

    #[test]
    fn full_stops_are_extended_only() -> Result<(), TitleError> {
        let tokens = tokenize("St. Ives", RoomSchema::Extended)?;
        assert_eq!(tokens[2], END_OR_STOP);
        assert_eq!(round_trip("St. Ives", RoomSchema::Extended)?, "St. Ives");
        assert_eq!(
            detokenize(&[18, 19, END_OR_STOP], RoomSchema::Classic)?,
            "St"
        );

        assert_eq!(
            tokenize("St. Ives", RoomSchema::Classic),
            Err(TitleError::Unsupported { ch: '.', pos: 2 })
        );
        Ok(())
    }

    #[test]
    fn trailing_the_uses_token() -> Result<(), TitleError> {
        // a "the" that ends the title is still a single token
        let tokens = tokenize("Bathe", RoomSchema::Classic)?;
        assert_eq!(&tokens[..], &[1, 0, THE, END_OR_STOP][..]);
        assert_eq!(round_trip("Bathe", RoomSchema::Classic)?, "Bathe");
        Ok(())
    }

    #[test]
    fn capitalised_mid_word() -> Result<(), TitleError> {
        let tokens = tokenize("McDonald", RoomSchema::Extended)?;
        assert_eq!(tokens[2], CAPITALISE);
        assert_eq!(round_trip("McDonald", RoomSchema::Extended)?, "McDonald");
        Ok(())
    }

    #[test]
    fn unsupported_titles() {
        assert_eq!(
            tokenize("Room 42", RoomSchema::Classic),
            Err(TitleError::Unsupported { ch: '4', pos: 5 })
        );
        assert!(matches!(
            tokenize("lower start", RoomSchema::Extended),
            Err(TitleError::Capitalisation { pos: 0, .. })
        ));
        assert!(matches!(
            tokenize("A room that goes on and on forever", RoomSchema::Classic),
            Err(TitleError::TooLong(34))
        ));
    }

    #[test]
    fn longest_title() -> Result<(), TitleError> {
        let text = "Abcdefghijklmnopqrstuvwxyz Abcde";
        assert_eq!(text.len(), MAX_TITLE_LEN);
        for &schema in &SCHEMAS {
            assert_eq!(round_trip(text, schema)?, text);
        }

        // 32 characters, but a capitalise token for every other letter
        let text = "AbCdEfGhIjKlMnOpQrStUvWxYzAbCdEf";
        assert_eq!(
            write_title(&mut BitChannel::new(), text, RoomSchema::Extended),
            Err(TitleError::TooManyTokens(47))
        );
        assert_eq!(round_trip(text, RoomSchema::Classic)?, text);
        Ok(())
    }

    #[test]
    fn runaway_title_is_an_error() {
        let mut bits = BitChannel::new();
        for _ in 0..40 {
            bits.push_bits(5, 0).unwrap();
        }
        bits.flush_to_byte_boundary();
        assert_eq!(read_title(&mut bits, RoomSchema::Classic), Err(TitleError::Overrun));

        // 32 counted "the" tokens decode to 96 characters
        let mut bits = BitChannel::new();
        bits.push_bits(5, 31).unwrap();
        for _ in 0..32 {
            bits.push_bits(5, THE as u32).unwrap();
        }
        bits.flush_to_byte_boundary();
        assert_eq!(read_title(&mut bits, RoomSchema::Extended), Err(TitleError::Overrun));
    }
}
