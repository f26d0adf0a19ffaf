//! Thread splitter: partitions text into length-bounded posts
//!
//! Text is cut on paragraph and sentence boundaries and packed greedily.
//! A sentence that cannot fit on its own is truncated at a word boundary
//! and closed with [`ELLIPSIS`]. Optional `i/n` position markers and a
//! hashtag line are added without ever exceeding the limit.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::model::{Thread, char_len};

/// Marker closing a truncated sentence
pub const ELLIPSIS: char = '…';

/// Smallest body the splitter will produce (one character plus the ellipsis)
const MIN_BODY_CHARS: usize = 2;

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t\r]*\n\s*").expect("valid paragraph regex"));

static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[.!?…]+["'”’)\]]*\s+"#).expect("valid sentence regex")
});

static POSITION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^\s*\(?\d{1,3}\s*/\s*\d{1,3}\)?[.):]?\s+)|(?:\s+\(?\d{1,3}\s*/\s*\d{1,3}\)?\s*$)")
        .expect("valid marker regex")
});

static TRAILING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\d{1,3}/\d{1,3}$").expect("valid trailing marker regex"));

/// Splitter configuration
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// Platform length limit per post, in characters
    pub max_chars: usize,
    /// Append " i/n" to every post of a multi-post thread
    pub numbering: bool,
    /// Hashtags added to the final post
    pub hashtags: Vec<String>,
    /// Upper bound on the number of posts (None = unlimited)
    pub max_posts: Option<usize>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            max_chars: 280,
            numbering: false,
            hashtags: vec![],
            max_posts: None,
        }
    }
}

/// Splitter errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    #[error("Nothing to split: input is empty")]
    EmptyInput,
    #[error("Limit of {max_chars} characters leaves no room for post text")]
    LimitTooSmall { max_chars: usize },
    #[error("Hashtag line is {len} characters, limit is {max}")]
    HashtagsTooLong { len: usize, max: usize },
    #[error("Thread needs {posts} posts, maximum is {max}")]
    TooManyPosts { posts: usize, max: usize },
}

#[derive(Debug)]
struct Segment {
    text: String,
    starts_paragraph: bool,
}

/// Splits text into a [`Thread`]
#[derive(Debug, Clone)]
pub struct Splitter {
    config: SplitConfig,
    hashtag_line: Option<String>,
}

impl Splitter {
    pub fn new(config: SplitConfig) -> Self {
        let hashtag_line = format_hashtags(&config.hashtags);
        Self {
            config,
            hashtag_line,
        }
    }

    /// Split raw text into posts
    ///
    /// A trailing hashtag line matching the configured hashtags is treated
    /// as already attached, so splitting a finished post returns it as is.
    pub fn split(&self, text: &str) -> Result<Thread, SplitError> {
        self.split_inner(text, None)
    }

    /// Split raw text into at most `limit` posts
    ///
    /// Sentences that do not fit are dropped from the end instead of
    /// failing; the hashtag line is kept on the final post.
    pub fn split_within(&self, text: &str, limit: usize) -> Result<Thread, SplitError> {
        self.split_inner(text, Some(limit.max(1)))
    }

    fn split_inner(&self, text: &str, limit: Option<usize>) -> Result<Thread, SplitError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SplitError::EmptyInput);
        }

        let (body, tagged) = self.strip_hashtag_line(text);
        let single = if tagged {
            text.to_string()
        } else {
            self.with_hashtags(text)
        };
        if char_len(&single) <= self.config.max_chars {
            return Ok(Thread { posts: vec![single] });
        }

        let segments = segment(body);
        self.assemble(|budget| pack(&segments, budget), limit)
    }

    /// Normalise posts written elsewhere (e.g. by a model) into a valid thread
    ///
    /// Posts that fit are kept as they are, minus any position marker the
    /// author added; longer ones are split like regular text.
    pub fn normalize(&self, posts: &[String]) -> Result<Thread, SplitError> {
        self.normalize_inner(posts, None)
    }

    /// [`Splitter::normalize`], keeping at most `limit` posts
    pub fn normalize_within(&self, posts: &[String], limit: usize) -> Result<Thread, SplitError> {
        self.normalize_inner(posts, Some(limit.max(1)))
    }

    fn normalize_inner(&self, posts: &[String], limit: Option<usize>) -> Result<Thread, SplitError> {
        let cleaned: Vec<String> = posts
            .iter()
            .map(|p| POSITION_MARKER.replace_all(p.trim(), "").trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        if cleaned.is_empty() {
            return Err(SplitError::EmptyInput);
        }

        self.assemble(
            |budget| {
                let mut bodies = Vec::new();
                for post in &cleaned {
                    let (body, _) = self.strip_hashtag_line(post);
                    if body.is_empty() {
                        continue;
                    }
                    if char_len(body) <= budget {
                        bodies.push(body.to_string());
                    } else {
                        bodies.extend(pack(&segment(body), budget));
                    }
                }
                bodies
            },
            limit,
        )
    }

    /// Run `make_bodies` with a budget that leaves room for markers,
    /// widening the reservation when the post count gains a digit.
    ///
    /// With a `limit`, bodies past it are dropped before hashtags and
    /// markers are added.
    fn assemble<F>(&self, make_bodies: F, limit: Option<usize>) -> Result<Thread, SplitError>
    where
        F: Fn(usize) -> Vec<String>,
    {
        let mut digits = 1;
        loop {
            let reserve = if self.config.numbering {
                marker_width(digits)
            } else {
                0
            };
            let budget = self.config.max_chars.saturating_sub(reserve);
            if budget < MIN_BODY_CHARS {
                return Err(SplitError::LimitTooSmall {
                    max_chars: self.config.max_chars,
                });
            }

            let mut bodies = make_bodies(budget);
            let produced = bodies.len();
            if let Some(limit) = limit {
                bodies.truncate(limit);
            }
            self.attach_hashtags(&mut bodies, budget)?;
            if let Some(limit) = limit {
                self.fold_hashtag_post(&mut bodies, budget, limit);
            }

            let count = bodies.len();
            if self.config.numbering && count > 1 && digit_count(count) > digits {
                digits = digit_count(count);
                continue;
            }

            if let Some(max) = self.config.max_posts {
                if count > max {
                    return Err(SplitError::TooManyPosts { posts: count, max });
                }
            }

            if self.config.numbering && count > 1 {
                for (i, body) in bodies.iter_mut().enumerate() {
                    body.push_str(&format!(" {}/{}", i + 1, count));
                }
            }

            if let Some(limit) = limit {
                if produced > limit {
                    tracing::warn!(
                        produced,
                        limit,
                        "Dropped trailing text to stay within the post limit"
                    );
                }
            }

            tracing::debug!(posts = count, budget, "Split thread");
            return Ok(Thread { posts: bodies });
        }
    }

    fn with_hashtags(&self, text: &str) -> String {
        match &self.hashtag_line {
            Some(tags) => format!("{}\n\n{}", text, tags),
            None => text.to_string(),
        }
    }

    /// Body of `text` without a trailing hashtag line this splitter would
    /// add itself, and whether one was found. A position marker after the
    /// hashtag line is ignored.
    fn strip_hashtag_line<'a>(&self, text: &'a str) -> (&'a str, bool) {
        let Some(tags) = &self.hashtag_line else {
            return (text, false);
        };

        let unmarked = TRAILING_MARKER
            .find(text)
            .map_or(text, |m| &text[..m.start()]);
        match unmarked.strip_suffix(tags.as_str()) {
            Some(body) if body.is_empty() || body.ends_with('\n') => (body.trim_end(), true),
            _ => (text, false),
        }
    }

    fn attach_hashtags(&self, bodies: &mut Vec<String>, budget: usize) -> Result<(), SplitError> {
        let Some(tags) = &self.hashtag_line else {
            return Ok(());
        };

        let tags_len = char_len(tags);
        if tags_len > budget {
            return Err(SplitError::HashtagsTooLong {
                len: tags_len,
                max: budget,
            });
        }

        match bodies.last_mut() {
            Some(last) if char_len(last) + 2 + tags_len <= budget => {
                last.push_str("\n\n");
                last.push_str(tags);
            }
            _ => bodies.push(tags.clone()),
        }
        Ok(())
    }

    /// When the hashtag line took a post of its own past `limit`, shorten
    /// the last body so the tags fit under it instead.
    fn fold_hashtag_post(&self, bodies: &mut Vec<String>, budget: usize, limit: usize) {
        let Some(tags) = &self.hashtag_line else {
            return;
        };
        if bodies.len() <= limit {
            return;
        }

        bodies.pop();
        let room = budget.saturating_sub(char_len(tags) + 2);
        match bodies.last_mut() {
            Some(last) if room >= MIN_BODY_CHARS => {
                if char_len(last) > room {
                    *last = truncate(last, room);
                }
                last.push_str("\n\n");
                last.push_str(tags);
            }
            Some(last) => *last = tags.clone(),
            None => bodies.push(tags.clone()),
        }
    }
}

/// Convenience wrapper around [`Splitter::split`]
pub fn split_text(text: &str, config: &SplitConfig) -> Result<Thread, SplitError> {
    Splitter::new(config.clone()).split(text)
}

/// Normalise hashtags into a single "#a #b" line, dropping blanks and duplicates
pub fn format_hashtags(tags: &[String]) -> Option<String> {
    let mut seen: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().trim_start_matches('#');
        if tag.is_empty() || tag.chars().any(char::is_whitespace) {
            continue;
        }
        let formatted = format!("#{}", tag);
        if !seen
            .iter()
            .any(|t| t.to_lowercase() == formatted.to_lowercase())
        {
            seen.push(formatted);
        }
    }

    if seen.is_empty() {
        None
    } else {
        Some(seen.join(" "))
    }
}

/// Break text into sentences, remembering where paragraphs start
fn segment(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();

    for paragraph in PARAGRAPH_BREAK.split(text) {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        let mut starts_paragraph = true;
        let mut start = 0;
        let mut push = |raw: &str, starts: &mut bool| {
            let sentence = raw.split_whitespace().collect::<Vec<_>>().join(" ");
            if !sentence.is_empty() {
                segments.push(Segment {
                    text: sentence,
                    starts_paragraph: *starts,
                });
                *starts = false;
            }
        };

        for boundary in SENTENCE_END.find_iter(paragraph) {
            push(&paragraph[start..boundary.end()], &mut starts_paragraph);
            start = boundary.end();
        }
        push(&paragraph[start..], &mut starts_paragraph);
    }

    segments
}

/// Greedy packing of sentences into bodies of at most `budget` characters
///
/// Sentences are merged only while the merged body stays below the budget;
/// a lone sentence may fill it exactly.
fn pack(segments: &[Segment], budget: usize) -> Vec<String> {
    let mut posts = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for segment in segments {
        let len = char_len(&segment.text);

        if len > budget {
            if !current.is_empty() {
                posts.push(std::mem::take(&mut current));
                current_len = 0;
            }
            posts.push(truncate(&segment.text, budget));
            continue;
        }

        if current.is_empty() {
            current.push_str(&segment.text);
            current_len = len;
            continue;
        }

        let separator = if segment.starts_paragraph { "\n\n" } else { " " };
        let merged_len = current_len + separator.len() + len;
        if merged_len < budget {
            current.push_str(separator);
            current.push_str(&segment.text);
            current_len = merged_len;
        } else {
            posts.push(std::mem::replace(&mut current, segment.text.clone()));
            current_len = len;
        }
    }

    if !current.is_empty() {
        posts.push(current);
    }

    posts
}

/// Cut a sentence to `budget` characters including the trailing ellipsis
fn truncate(text: &str, budget: usize) -> String {
    let keep = budget.saturating_sub(1);
    let prefix: String = text.chars().take(keep).collect();
    let at_boundary = text.chars().nth(keep).is_none_or(char::is_whitespace);

    let mut cut = if at_boundary {
        prefix.as_str()
    } else {
        match prefix.rfind(char::is_whitespace) {
            Some(idx) if idx > 0 => &prefix[..idx],
            _ => prefix.as_str(),
        }
    };

    cut = cut.trim_end_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':'));
    if cut.is_empty() {
        cut = prefix.as_str();
    }

    format!("{}{}", cut, ELLIPSIS)
}

/// Width of " n/n" with `digits` digits on both sides
fn marker_width(digits: usize) -> usize {
    2 + 2 * digits
}

fn digit_count(n: usize) -> usize {
    n.to_string().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(max_chars: usize) -> Splitter {
        Splitter::new(SplitConfig {
            max_chars,
            ..Default::default()
        })
    }

    fn long_text() -> String {
        let mut paragraphs = Vec::new();
        for p in 0..6 {
            let sentences: Vec<String> = (0..5)
                .map(|s| {
                    format!(
                        "Paragraph {} sentence {} explains one more detail about the topic at hand.",
                        p, s
                    )
                })
                .collect();
            paragraphs.push(sentences.join(" "));
        }
        paragraphs.join("\n\n")
    }

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_text_that_fits_is_a_single_identical_post() {
        let text = "Short thought. Still short!";
        let thread = splitter(280).split(text).unwrap();

        assert_eq!(thread.posts, vec![text.to_string()]);
    }

    #[test]
    fn test_sentences_packed_without_reaching_limit() {
        let thread = splitter(5).split("A. B. C.").unwrap();

        assert_eq!(thread.posts, vec!["A.", "B.", "C."]);
    }

    #[test]
    fn test_long_sentence_truncated_with_ellipsis() {
        let sentence = format!("{}end.", "word ".repeat(99));
        assert_eq!(char_len(&sentence), 499);

        let thread = splitter(280).split(&sentence).unwrap();

        assert_eq!(thread.len(), 1);
        assert!(thread.posts[0].ends_with(ELLIPSIS));
        assert!(char_len(&thread.posts[0]) <= 280);
        assert!(!thread.posts[0].contains("wor…"));
    }

    #[test]
    fn test_word_without_spaces_is_hard_cut() {
        let thread = splitter(10).split(&"x".repeat(50)).unwrap();

        assert_eq!(thread.posts, vec![format!("{}{}", "x".repeat(9), ELLIPSIS)]);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert_eq!(splitter(280).split(""), Err(SplitError::EmptyInput));
        assert_eq!(splitter(280).split("  \n\t "), Err(SplitError::EmptyInput));
    }

    #[test]
    fn test_every_post_within_limit() {
        let text = long_text();
        for numbering in [false, true] {
            let splitter = Splitter::new(SplitConfig {
                max_chars: 140,
                numbering,
                hashtags: vec!["rust".to_string(), "threads".to_string()],
                max_posts: None,
            });

            let thread = splitter.split(&text).unwrap();

            assert!(thread.len() > 1);
            for post in &thread.posts {
                assert!(char_len(post) <= 140, "too long: {:?}", post);
            }
        }
    }

    #[test]
    fn test_no_sentence_dropped() {
        let text = long_text();
        let thread = splitter(120).split(&text).unwrap();

        assert_eq!(words(&thread.posts.join(" ")), words(&text));
    }

    #[test]
    fn test_paragraph_breaks_kept_inside_a_post() {
        let text = "First paragraph here.\n\nSecond paragraph here. And more text follows it.";
        let thread = splitter(50).split(text).unwrap();

        assert_eq!(
            thread.posts,
            vec![
                "First paragraph here.\n\nSecond paragraph here.",
                "And more text follows it."
            ]
        );
    }

    #[test]
    fn test_split_is_idempotent_per_post() {
        let tagged = |numbering| SplitConfig {
            max_chars: 100,
            numbering,
            hashtags: vec!["rust".to_string(), "threads".to_string()],
            max_posts: None,
        };
        let configs = [
            SplitConfig {
                max_chars: 100,
                ..Default::default()
            },
            SplitConfig {
                max_chars: 100,
                numbering: true,
                ..Default::default()
            },
            tagged(false),
            tagged(true),
        ];

        for config in configs {
            let splitter = Splitter::new(config.clone());
            let thread = splitter.split(&long_text()).unwrap();
            let last = thread.len() - 1;

            for (i, post) in thread.posts.iter().enumerate() {
                // Hashtags go on whatever post ends the text being split
                if !config.hashtags.is_empty() && i != last {
                    continue;
                }
                let again = splitter.split(post).unwrap();
                assert_eq!(again.posts, vec![post.clone()], "{:?}", config);
            }
        }
    }

    #[test]
    fn test_resplitting_tagged_post_keeps_one_hashtag_line() {
        let splitter = Splitter::new(SplitConfig {
            max_chars: 60,
            hashtags: vec!["rust".to_string()],
            ..Default::default()
        });

        let first = splitter.split("First sentence is here and long.").unwrap();
        assert_eq!(first.posts, vec!["First sentence is here and long.\n\n#rust"]);
        assert_eq!(splitter.split(&first.posts[0]).unwrap(), first);

        let closing = "Second sentence closes the thread on a high note.\n\n#rust";
        assert_eq!(
            splitter.split(closing).unwrap().posts,
            vec![closing.to_string()]
        );
        assert_eq!(splitter.split("#rust").unwrap().posts, vec!["#rust"]);
    }

    #[test]
    fn test_trailing_hashtag_line_not_split_into_own_sentence() {
        let splitter = Splitter::new(SplitConfig {
            max_chars: 30,
            hashtags: vec!["rust".to_string()],
            ..Default::default()
        });

        let thread = splitter
            .split("Borrowing rules first. Lifetimes come next.\n\n#rust")
            .unwrap();

        assert_eq!(
            thread.posts,
            vec!["Borrowing rules first.", "Lifetimes come next.\n\n#rust"]
        );
    }

    #[test]
    fn test_split_within_drops_trailing_posts() {
        let thread = splitter(5).split_within("A. B. C.", 2).unwrap();

        assert_eq!(thread.posts, vec!["A.", "B."]);
    }

    #[test]
    fn test_split_within_keeps_hashtags_and_markers() {
        let splitter = Splitter::new(SplitConfig {
            max_chars: 40,
            numbering: true,
            hashtags: vec!["rust".to_string()],
            max_posts: Some(2),
        });

        let thread = splitter.split_within(&long_text(), 2).unwrap();

        assert_eq!(thread.len(), 2);
        assert!(thread.posts[0].ends_with(" 1/2"));
        assert!(thread.posts[1].ends_with("\n\n#rust 2/2"));
        for post in &thread.posts {
            assert!(char_len(post) <= 40, "too long: {:?}", post);
        }
    }

    #[test]
    fn test_normalize_within_caps_model_posts() {
        let posts: Vec<String> = (1..=5).map(|i| format!("Point {}.", i)).collect();

        let thread = splitter(280).normalize_within(&posts, 3).unwrap();

        assert_eq!(thread.posts, vec!["Point 1.", "Point 2.", "Point 3."]);
    }

    #[test]
    fn test_numbering_markers() {
        let splitter = Splitter::new(SplitConfig {
            max_chars: 12,
            numbering: true,
            ..Default::default()
        });

        let thread = splitter.split("One. Two. Three.").unwrap();

        assert_eq!(thread.posts, vec!["One. 1/3", "Two. 2/3", "Three. 3/3"]);
    }

    #[test]
    fn test_numbering_reserves_room_for_two_digit_counts() {
        let text = (1..=15)
            .map(|i| format!("Sentence number {} is here.", i))
            .collect::<Vec<_>>()
            .join(" ");
        let splitter = Splitter::new(SplitConfig {
            max_chars: 32,
            numbering: true,
            ..Default::default()
        });

        let thread = splitter.split(&text).unwrap();

        assert!(thread.len() >= 10);
        let total = thread.len();
        assert!(thread.posts[0].ends_with(&format!(" 1/{}", total)));
        for post in &thread.posts {
            assert!(char_len(post) <= 32, "too long: {:?}", post);
        }
    }

    #[test]
    fn test_hashtags_appended_to_last_post() {
        let splitter = Splitter::new(SplitConfig {
            max_chars: 280,
            hashtags: vec!["#Rust".to_string(), "rust".to_string(), "cli".to_string()],
            ..Default::default()
        });

        let thread = splitter.split("Hello world.").unwrap();

        assert_eq!(thread.posts, vec!["Hello world.\n\n#Rust #cli"]);
    }

    #[test]
    fn test_hashtags_get_own_post_when_last_is_full() {
        let splitter = Splitter::new(SplitConfig {
            max_chars: 20,
            hashtags: vec!["rustlang".to_string()],
            ..Default::default()
        });

        let thread = splitter.split("Exactly twenty chars").unwrap();

        assert_eq!(thread.posts, vec!["Exactly twenty chars", "#rustlang"]);
    }

    #[test]
    fn test_too_many_posts() {
        let splitter = Splitter::new(SplitConfig {
            max_chars: 5,
            max_posts: Some(2),
            ..Default::default()
        });

        assert_eq!(
            splitter.split("A. B. C."),
            Err(SplitError::TooManyPosts { posts: 3, max: 2 })
        );
    }

    #[test]
    fn test_limit_too_small_for_markers() {
        let splitter = Splitter::new(SplitConfig {
            max_chars: 4,
            numbering: true,
            ..Default::default()
        });

        assert!(matches!(
            splitter.split("A. B. C."),
            Err(SplitError::LimitTooSmall { .. })
        ));
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let text = "Ünïcödé wörds ärë fïnë. ".repeat(20);
        let thread = splitter(50).split(&text).unwrap();

        for post in &thread.posts {
            assert!(char_len(post) <= 50);
        }
        assert_eq!(words(&thread.posts.join(" ")), words(&text));
    }

    #[test]
    fn test_normalize_strips_model_markers_and_splits_long_posts() {
        let splitter = Splitter::new(SplitConfig {
            max_chars: 40,
            numbering: true,
            ..Default::default()
        });
        let posts = vec![
            "1/3 Rust is fast.".to_string(),
            "It is also memory safe without a garbage collector. Really. (2/3)".to_string(),
            "   ".to_string(),
            "Try it today! 3/3".to_string(),
        ];

        let thread = splitter.normalize(&posts).unwrap();

        assert_eq!(thread.posts[0], format!("Rust is fast. 1/{}", thread.len()));
        assert!(thread.posts.last().unwrap().starts_with("Try it today!"));
        for post in &thread.posts {
            assert!(char_len(post) <= 40);
        }
    }

    #[test]
    fn test_normalize_rejects_all_blank() {
        assert_eq!(
            splitter(280).normalize(&["  ".to_string()]),
            Err(SplitError::EmptyInput)
        );
    }

    #[test]
    fn test_format_hashtags() {
        assert_eq!(format_hashtags(&[]), None);
        assert_eq!(
            format_hashtags(&["a".to_string(), " #b ".to_string(), "two words".to_string()]),
            Some("#a #b".to_string())
        );
    }
}
