// ============================================
// src/transliterate.rs
// 原語 -> タイプ可能なローマ字への翻字
// (パックにローマ字が無いときのフォールバック)
// ============================================

use crate::words::Language;

/// 翻字の差し替え口。失敗はせず、最悪でも ASCII だけ残した文字列を返す
pub trait Transliterate {
    fn transliterate(&self, original: &str, language: Language) -> String;
}

/// 表引きだけの簡易な翻字
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicTransliterator;

impl Transliterate for BasicTransliterator {
    fn transliterate(&self, original: &str, language: Language) -> String {
        if original.is_empty() {
            return String::new();
        }
        let romanized = match language {
            Language::Russian => cyrillic_to_latin(original),
            Language::Spanish | Language::German | Language::French => fold_to_ascii(original),
            // アラビア文字・漢字・仮名などは辞書なしでは無理なので ASCII だけ拾う
            _ => ascii_only(original),
        };
        if romanized.is_empty() {
            tracing::debug!(%language, original, "transliteration produced an empty string");
        }
        romanized
    }
}

/// ラテン文字のアクセントを落とす。対応外は None
pub fn fold_latin(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'å' | 'ā' => "a",
        'ä' => "ae",
        'æ' => "ae",
        'ç' | 'č' | 'ć' => "c",
        'è' | 'é' | 'ê' | 'ë' | 'ē' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'ī' => "i",
        'ñ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ø' | 'ō' => "o",
        'ö' => "oe",
        'œ' => "oe",
        'ù' | 'ú' | 'û' | 'ū' => "u",
        'ü' => "ue",
        'ý' | 'ÿ' => "y",
        'ß' => "ss",
        'š' => "s",
        'ž' => "z",
        _ => return None,
    };
    Some(folded)
}

fn fold_to_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() {
            out.push(c);
        } else if let Some(folded) = fold_latin(c) {
            out.push_str(folded);
        }
    }
    out
}

fn ascii_only(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || *c == '\'' || *c == '-')
        .collect()
}

fn cyrillic_to_latin(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    for c in text.chars().flat_map(char::to_lowercase) {
        let latin = match c {
            'а' => "a",
            'б' => "b",
            'в' => "v",
            'г' => "g",
            'д' => "d",
            'е' => "e",
            'ё' => "yo",
            'ж' => "zh",
            'з' => "z",
            'и' => "i",
            'й' => "y",
            'к' => "k",
            'л' => "l",
            'м' => "m",
            'н' => "n",
            'о' => "o",
            'п' => "p",
            'р' => "r",
            'с' => "s",
            'т' => "t",
            'у' => "u",
            'ф' => "f",
            'х' => "kh",
            'ц' => "ts",
            'ч' => "ch",
            'ш' => "sh",
            'щ' => "shch",
            'ъ' | 'ь' => "",
            'ы' => "y",
            'э' => "e",
            'ю' => "yu",
            'я' => "ya",
            c if c.is_ascii_lowercase() => {
                out.push(c);
                continue;
            }
            _ => continue,
        };
        out.push_str(latin);
    }
    out
}
