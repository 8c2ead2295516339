use unicode_segmentation::UnicodeSegmentation;

/// Tokenizer for mixed CJK/Latin card text.
///
/// CJK runs are split into character bigrams (plus a unigram for
/// single-character runs) so substring matches inside names and effect
/// text hit the index; everything else goes through Unicode word
/// segmentation and is lowercased whole. Runs are detected by script,
/// not by UAX#29 boundaries, because word segmentation splits Han and
/// Hiragana into single-character segments.
#[derive(Debug, Clone)]
pub struct CardTokenizer {
    pub max_token_length: usize,
}

impl Default for CardTokenizer {
    fn default() -> Self {
        CardTokenizer {
            max_token_length: 255,
        }
    }
}

impl CardTokenizer {
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut cjk_run: Vec<char> = Vec::new();
        let mut latin_buf = String::new();

        for ch in text.chars() {
            if is_cjk(ch) {
                if !latin_buf.is_empty() {
                    self.emit_latin(&latin_buf, &mut tokens);
                    latin_buf.clear();
                }
                cjk_run.push(ch);
            } else {
                if !cjk_run.is_empty() {
                    self.emit_cjk(&cjk_run, &mut tokens);
                    cjk_run.clear();
                }
                latin_buf.push(ch);
            }
        }
        if !latin_buf.is_empty() {
            self.emit_latin(&latin_buf, &mut tokens);
        }
        if !cjk_run.is_empty() {
            self.emit_cjk(&cjk_run, &mut tokens);
        }

        tokens
    }

    fn emit_cjk(&self, run: &[char], tokens: &mut Vec<String>) {
        if run.len() == 1 {
            tokens.push(run[0].to_string());
            return;
        }
        for pair in run.windows(2) {
            tokens.push(pair.iter().collect());
        }
    }

    fn emit_latin(&self, buf: &str, tokens: &mut Vec<String>) {
        for word in buf.unicode_words() {
            if word.len() <= self.max_token_length {
                tokens.push(word.to_lowercase());
            }
        }
    }
}

/// Han, Hiragana and Katakana ranges
pub fn is_cjk(ch: char) -> bool {
    matches!(ch,
        '\u{4E00}'..='\u{9FFF}'     // CJK Unified Ideographs
        | '\u{3400}'..='\u{4DBF}'   // Extension A
        | '\u{F900}'..='\u{FAFF}'   // Compatibility Ideographs
        | '\u{3040}'..='\u{309F}'   // Hiragana
        | '\u{30A0}'..='\u{30FF}'   // Katakana
        | '\u{31F0}'..='\u{31FF}'   // Katakana Phonetic Extensions
        | '\u{FF66}'..='\u{FF9D}'   // Halfwidth Katakana
    )
}

/// True when no character of the token is CJK, i.e. the token is
/// eligible for edit-distance fuzzy expansion
pub fn is_latin_token(token: &str) -> bool {
    !token.chars().any(is_cjk)
}
