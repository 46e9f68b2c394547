// 该文件是 Ishara （手语识别） 项目的一部分。
// src/sentence.rs - 句子拼接与阿拉伯文文本处理
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use tracing::info;

const MAX_SUGGESTIONS: usize = 5;
const MAX_WORD_SIGNS: usize = 5;

/// 按顺序应用的字母组合规则
const GRAMMAR_RULES: [(&str, &str); 21] = [
  // 常见词
  ("أ ن ا", "أنا"),
  ("أ ن ت", "أنت"),
  ("ه ذ ا", "هذا"),
  ("ه ذ ه", "هذه"),
  ("م ن", "من"),
  ("إ ل ى", "إلى"),
  ("ع ل ى", "على"),
  ("ف ي", "في"),
  ("م ع", "مع"),
  ("ل ا", "لا"),
  ("ن ع م", "نعم"),
  // 前缀
  ("ال ", "ال"),
  ("و ال", "وال"),
  ("ب ال", "بال"),
  ("ل ل", "لل"),
  // 后缀
  (" ة", "ة"),
  (" ها", "ها"),
  (" هم", "هم"),
  (" هن", "هن"),
  (" ك", "ك"),
  (" ي", "ي"),
];

const WORD_ENDINGS: [&str; 8] = ["ة", "ه", "ك", "ها", "هم", "هن", "ي", "نا"];

const STANDALONE_WORDS: [&str; 16] = [
  "أنا", "أنت", "هو", "هي", "نحن", "أنتم", "هم", "هن", "لا", "نعم", "من", "ما", "أين", "كيف", "متى",
  "لماذا",
];

/// 按首字母索引的常用词
const COMMON_WORDS: [(&str, [&str; 15]); 10] = [
  (
    "أ",
    [
      "أنا", "أنت", "أين", "أهلاً", "أمي", "أبي", "أخي", "أختي", "أرجوك", "أشكرك", "أحبك", "أصدقاء",
      "أعتذر", "أمس", "أبداً",
    ],
  ),
  (
    "ب",
    [
      "بيت", "باب", "بنت", "بلد", "بكرة", "بارد", "بعيد", "بخير", "بطيء", "بسرعة", "بقوة", "بسم الله",
      "بحر", "بدون", "بعد",
    ],
  ),
  (
    "ت",
    [
      "تفاح", "تمر", "توت", "تلفاز", "تعال", "تعلم", "تعب", "تقدم", "تجربة", "تسوق", "تحت", "تماماً",
      "تنزه", "تأخر", "تزور",
    ],
  ),
  (
    "س",
    [
      "سلام", "سعيد", "سماء", "سوق", "سعر", "سيارة", "سنة", "سهل", "سريع", "سؤال", "سمك", "سكر", "سفر",
      "سعادة", "سلة",
    ],
  ),
  (
    "ش",
    [
      "شكراً", "شمس", "شاي", "شارع", "شتاء", "شهر", "شيء", "شباب", "شاطئ", "شجرة", "شاحنة", "شرق",
      "شهادة", "شوق", "شعب",
    ],
  ),
  (
    "ص",
    [
      "صباح", "صديق", "صوت", "صحة", "صيف", "صغير", "صلاة", "صورة", "صحراء", "صعب", "صواب", "صندوق",
      "صادق", "صفحة", "صالون",
    ],
  ),
  (
    "ط",
    [
      "طعام", "طريق", "طويل", "طالب", "طبيب", "طاولة", "طازج", "طقس", "طيور", "طيارة", "طلب", "طفل",
      "طبخ", "طبيعة", "طاقة",
    ],
  ),
  (
    "ع",
    [
      "عمل", "عائلة", "عيد", "عصير", "عنب", "عربي", "عام", "عندي", "عين", "عقل", "عالم", "عمر", "عظيم",
      "عادل", "علم",
    ],
  ),
  (
    "م",
    [
      "مدرسة", "ماء", "مكتب", "مساء", "مريض", "مفتاح", "منزل", "معلم", "مرحباً", "مستشفى", "مطار",
      "مطعم", "مكان", "مهم", "ممتاز",
    ],
  ),
  (
    "ن",
    [
      "نعم", "نوم", "نهار", "نجاح", "نور", "نادي", "نظيف", "نقود", "نهاية", "نعمة", "نسيت", "نتيجة",
      "نحن", "نقطة", "نفس",
    ],
  ),
];

/// 文本方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDirection {
  Rtl,
  Ltr,
}

fn is_arabic_char(c: char) -> bool {
  ('\u{0600}'..='\u{06FF}').contains(&c)
}

// 标音符号与延长符
fn is_diacritic(c: char) -> bool {
  ('\u{064B}'..='\u{0652}').contains(&c) || c == '\u{0670}' || c == '\u{0640}'
}

fn collapse_whitespace(text: &str) -> String {
  text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn is_arabic_text(text: &str) -> bool {
  text.chars().any(is_arabic_char)
}

pub fn text_direction(text: &str) -> TextDirection {
  if is_arabic_text(text) {
    TextDirection::Rtl
  } else {
    TextDirection::Ltr
  }
}

/// 去除标音符号并合并多余空白
pub fn clean_arabic_text(text: &str) -> String {
  let stripped: String = text.chars().filter(|c| !is_diacritic(*c)).collect();
  collapse_whitespace(&stripped)
}

/// 用于界面展示的文本，不做字形连写与双向重排
pub fn format_for_display(text: &str) -> String {
  clean_arabic_text(text)
}

/// 合并空白后按顺序应用字母组合规则
pub fn apply_grammar(text: &str) -> String {
  let mut text = collapse_whitespace(text);
  for (pattern, replacement) in GRAMMAR_RULES {
    text = text.replace(pattern, replacement);
  }
  text
}

/// 以空格连接各个手势后应用语法规则
pub fn combine_signs<S: AsRef<str>>(signs: &[S]) -> String {
  let joined = signs.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" ");
  apply_grammar(&joined)
}

/// 将手势序列切分为单词
pub fn detect_word_boundaries<S: AsRef<str>>(signs: &[S]) -> Vec<String> {
  let mut words = Vec::new();
  let mut current: Vec<&str> = Vec::new();

  for sign in signs {
    let sign = sign.as_ref();
    current.push(sign);
    let word = current.concat();

    let complete = STANDALONE_WORDS.contains(&word.as_str())
      || (WORD_ENDINGS.contains(&sign) && current.len() > 1)
      || current.len() >= MAX_WORD_SIGNS;
    if complete {
      words.push(word);
      current.clear();
    }
  }

  if !current.is_empty() {
    words.push(current.concat());
  }
  words
}

/// 根据首字母或前缀给出候选词
pub fn suggest_words(prefix: &str) -> Vec<&'static str> {
  let Some(first) = prefix.chars().next() else {
    return Vec::new();
  };
  let first = first.to_string();
  let Some((_, words)) = COMMON_WORDS.iter().find(|(letter, _)| *letter == first) else {
    return Vec::new();
  };

  words
    .iter()
    .copied()
    .filter(|word| word.starts_with(prefix))
    .take(MAX_SUGGESTIONS)
    .collect()
}

/// 识别结果拼接成的句子
#[derive(Debug, Clone, Default)]
pub struct SentenceBuilder {
  raw: String,
}

impl SentenceBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// 追加文本并返回应用语法规则后的句子，空文本不做改动
  pub fn push(&mut self, text: &str) -> String {
    let text = text.trim();
    if !text.is_empty() {
      if !self.raw.is_empty() {
        self.raw.push(' ');
      }
      self.raw.push_str(text);
      info!("追加 '{}' 到句子，当前句子: '{}'", text, self.sentence());
    }
    self.sentence()
  }

  pub fn sentence(&self) -> String {
    apply_grammar(&self.raw)
  }

  pub fn raw(&self) -> &str {
    &self.raw
  }

  pub fn clear(&mut self) {
    self.raw.clear();
  }

  pub fn is_empty(&self) -> bool {
    self.raw.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn letters_combine_into_words() {
    assert_eq!(apply_grammar("أ ن ا"), "أنا");
    assert_eq!(apply_grammar("  ن   ع م "), "نعم");
    assert_eq!(combine_signs(&["م", "د", "ر", "س", "ة"]), "م د ر سة");
  }

  #[test]
  fn builder_joins_with_spaces() {
    let mut builder = SentenceBuilder::new();
    builder.push("ن");
    builder.push("ع");
    assert_eq!(builder.push("م"), "نعم");
    assert_eq!(builder.raw(), "ن ع م");
    assert_eq!(builder.push(""), "نعم");

    builder.push("شكراً");
    assert_eq!(builder.sentence(), "نعم شكراً");

    builder.clear();
    assert!(builder.is_empty());
    assert_eq!(builder.sentence(), "");
  }

  #[test]
  fn word_boundaries() {
    assert_eq!(
      detect_word_boundaries(&["أ", "ن", "ا", "ب", "ي"]),
      vec!["أنا", "بي"]
    );
    assert_eq!(
      detect_word_boundaries(&["س", "ل", "ا", "م", "ع", "ل"]),
      vec!["سلامع", "ل"]
    );
    assert!(detect_word_boundaries::<&str>(&[]).is_empty());
  }

  #[test]
  fn suggestions_by_letter_and_prefix() {
    assert_eq!(
      suggest_words("ش"),
      vec!["شكراً", "شمس", "شاي", "شارع", "شتاء"]
    );
    assert_eq!(suggest_words("سع"), vec!["سعيد", "سعر", "سعادة"]);
    assert!(suggest_words("ق").is_empty());
    assert!(suggest_words("").is_empty());
  }

  #[test]
  fn arabic_text_helpers() {
    assert!(is_arabic_text("hello مرحبا"));
    assert!(!is_arabic_text("hello"));
    assert_eq!(text_direction("نعم"), TextDirection::Rtl);
    assert_eq!(text_direction("yes"), TextDirection::Ltr);
    assert_eq!(clean_arabic_text("مَرْحَبًا   بِكُم"), "مرحبا بكم");
    assert_eq!(format_for_display(" شـكـراً "), "شكرا");
  }
}
