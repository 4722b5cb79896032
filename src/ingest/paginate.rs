//! Splits extracted text into fixed-size reader pages.

/// One reconstructed page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// Zero-based page position
    pub index: usize,
    pub content: String,
    pub word_count: usize,
}

/// Groups paragraphs into pages of at most `words_per_page` words.
///
/// Blank lines separate paragraphs; paragraph boundaries are preferred page breaks and
/// paragraphs longer than a page are cut at word boundaries.
#[derive(Debug, Clone)]
pub struct Paginator {
    words_per_page: usize,
}

impl Paginator {
    pub fn new(words_per_page: usize) -> Self {
        Self {
            words_per_page: words_per_page.max(1),
        }
    }

    pub fn paginate(&self, text: &str) -> Vec<PageText> {
        let mut pages = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_words = 0usize;

        for paragraph in paragraphs(text) {
            let mut words: &[&str] = &paragraph;

            // Flow to a fresh page instead of splitting a paragraph that would fit on one.
            if current_words > 0
                && current_words + words.len() > self.words_per_page
                && words.len() <= self.words_per_page
            {
                self.flush(&mut pages, &mut current, &mut current_words);
            }

            while !words.is_empty() {
                let room = self.words_per_page - current_words;
                let take = room.min(words.len());
                current.push(words[..take].join(" "));
                current_words += take;
                words = &words[take..];

                if current_words == self.words_per_page {
                    self.flush(&mut pages, &mut current, &mut current_words);
                }
            }
        }

        self.flush(&mut pages, &mut current, &mut current_words);
        pages
    }

    fn flush(&self, pages: &mut Vec<PageText>, current: &mut Vec<String>, words: &mut usize) {
        if current.is_empty() {
            return;
        }
        pages.push(PageText {
            index: pages.len(),
            content: current.join("\n\n"),
            word_count: *words,
        });
        current.clear();
        *words = 0;
    }
}

/// Paragraphs as word lists. Whitespace inside a paragraph collapses to single spaces.
fn paragraphs(text: &str) -> Vec<Vec<&str>> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.extend(line.split_whitespace());
    }
    if !current.is_empty() {
        out.push(current);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize, prefix: &str) -> String {
        (0..n)
            .map(|i| format!("{}{}", prefix, i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_empty_text_has_no_pages() {
        let paginator = Paginator::new(10);
        assert!(paginator.paginate("").is_empty());
        assert!(paginator.paginate("  \n\n \t\n").is_empty());
    }

    #[test]
    fn test_short_paragraphs_share_a_page() {
        let paginator = Paginator::new(10);
        let pages = paginator.paginate("uno dos tres\n\ncuatro cinco");

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].content, "uno dos tres\n\ncuatro cinco");
        assert_eq!(pages[0].word_count, 5);
        assert_eq!(pages[0].index, 0);
    }

    #[test]
    fn test_paragraph_flows_to_next_page() {
        let paginator = Paginator::new(10);
        let text = format!("{}\n\n{}", words(6, "a"), words(6, "b"));
        let pages = paginator.paginate(&text);

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].content, words(6, "a"));
        assert_eq!(pages[1].content, words(6, "b"));
        assert_eq!(pages[1].index, 1);
    }

    #[test]
    fn test_long_paragraph_is_split_at_word_boundaries() {
        let paginator = Paginator::new(10);
        let pages = paginator.paginate(&words(25, "w"));

        assert_eq!(pages.len(), 3);
        assert_eq!(
            pages.iter().map(|p| p.word_count).collect::<Vec<_>>(),
            vec![10, 10, 5]
        );
        assert!(pages[0].content.starts_with("w0 "));
        assert!(pages[2].content.ends_with("w24"));
    }

    #[test]
    fn test_no_words_are_lost() {
        let paginator = Paginator::new(7);
        let text = format!(
            "{}\n\n{}\n\n\n{}\n{}",
            words(3, "a"),
            words(12, "b"),
            words(4, "c"),
            words(2, "d")
        );
        let pages = paginator.paginate(&text);

        let total: usize = pages.iter().map(|p| p.word_count).sum();
        assert_eq!(total, 21);
        assert!(pages.iter().all(|p| p.word_count <= 7));
        assert_eq!(
            pages
                .iter()
                .map(|p| p.content.split_whitespace().count())
                .sum::<usize>(),
            21
        );
    }

    #[test]
    fn test_inner_whitespace_is_normalized() {
        let paginator = Paginator::new(50);
        let pages = paginator.paginate("  hola   mundo\n  de  nuevo  ");
        assert_eq!(pages[0].content, "hola mundo de nuevo");
    }
}
