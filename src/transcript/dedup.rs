//! Fuzzy deduplication of overlap-derived transcript text.
//!
//! Each chunk shares its overlap audio with the previous one, so the engine
//! re-transcribes the boundary region and near-duplicate text arrives with
//! every result. This stage strips the repetition through a fixed sequence
//! of filters:
//!
//! 1. whitespace tokenization;
//! 2. exact suppression against the last emitted line (case-insensitive);
//! 3. prefix-overlap suppression against the trailing token window;
//! 4. whole-line fuzzy suppression against recent history lines;
//! 5. residual overlap trim against the global token history;
//! 6. consecutive-repetition collapse;
//! 7. state update with the emitted tokens.
//!
//! The algorithm is order-sensitive: calls must arrive in ascending chunk
//! order from a single writer. All history state is bounded (ring buffers
//! with oldest-eviction).

use crate::config::DedupConfig;
use std::collections::VecDeque;

/// Similarity ratio of two sequences in [0, 1].
///
/// Longest-common-subsequence based: `2 * lcs / (len(a) + len(b))`.
/// Two empty sequences are identical (ratio 1).
pub fn similarity_ratio<T: PartialEq>(a: &[T], b: &[T]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    2.0 * lcs_len(a, b) as f64 / (a.len() + b.len()) as f64
}

/// Similarity ratio of two lines, compared case-insensitively by character.
pub fn line_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    similarity_ratio(&a, &b)
}

/// Longest common subsequence length, O(len(a) * len(b)) with a rolling row.
fn lcs_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];

    for item_a in a {
        for (j, item_b) in b.iter().enumerate() {
            current[j + 1] = if item_a == item_b {
                prev[j] + 1
            } else {
                prev[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()]
}

/// Longest run of tokens shared between `history` and the *start* of
/// `candidate` (the match is anchored at candidate position 0).
fn longest_anchored_run(history: &VecDeque<String>, candidate: &[String]) -> usize {
    if history.is_empty() || candidate.is_empty() {
        return 0;
    }

    // VecDeque contiguity is not guaranteed; collect once.
    let history: Vec<&String> = history.iter().collect();
    let mut best = 0;

    for start in 0..history.len() {
        let mut run = 0;
        while start + run < history.len()
            && run < candidate.len()
            && *history[start + run] == candidate[run]
        {
            run += 1;
        }
        best = best.max(run);
    }
    best
}

/// Collapse runs of the same consecutive token (case-insensitive) down to
/// at most `max_repeat` occurrences.
fn collapse_repeats(tokens: Vec<String>, max_repeat: usize) -> Vec<String> {
    let mut output: Vec<String> = Vec::with_capacity(tokens.len());
    let mut repeat_count = 0usize;

    for token in tokens {
        match output.last() {
            Some(last) if last.eq_ignore_ascii_case(&token) => {
                repeat_count += 1;
                if repeat_count >= max_repeat {
                    continue;
                }
            }
            _ => repeat_count = 0,
        }
        output.push(token);
    }
    output
}

/// Stateful transcript deduplicator. Single-writer, chunk-index order.
pub struct TranscriptDeduplicator {
    config: DedupConfig,
    /// Trailing token window for prefix-overlap suppression (cap N).
    tail: VecDeque<String>,
    /// Last emitted line, for exact suppression.
    last_line: String,
    /// Recently emitted lines for whole-line suppression (cap M).
    lines: VecDeque<String>,
    /// Global emitted-token history for residual trims (cap K).
    tokens: VecDeque<String>,
}

impl TranscriptDeduplicator {
    pub fn new(config: DedupConfig) -> Self {
        Self {
            config,
            tail: VecDeque::new(),
            last_line: String::new(),
            lines: VecDeque::new(),
            tokens: VecDeque::new(),
        }
    }

    /// Deduplicate one chunk's merged text; returns the cleaned text, or an
    /// empty string when everything was suppressed.
    pub fn dedup(&mut self, new_text: &str) -> String {
        let mut tokens: Vec<String> = new_text.split_whitespace().map(str::to_string).collect();
        if tokens.is_empty() {
            return String::new();
        }

        // Exact suppression against the last emitted line.
        let line = tokens.join(" ");
        if !self.last_line.is_empty() && line.eq_ignore_ascii_case(&self.last_line) {
            return String::new();
        }

        // Prefix-overlap suppression: the tail of the previous window vs the
        // same-length prefix of the new tokens. Windows shorter than three
        // tokens are too noisy to compare.
        if !self.tail.is_empty() {
            let window = self
                .config
                .window_size
                .min(tokens.len())
                .min(self.tail.len());
            if window >= 3 {
                let tail_slice: Vec<String> =
                    self.tail.iter().skip(self.tail.len() - window).cloned().collect();
                let ratio = similarity_ratio(&tail_slice, &tokens[..window]);
                if ratio >= self.config.fuzzy_threshold {
                    tokens.drain(..window);
                }
            }
        }

        // Whole-line fuzzy suppression against recent history. Applied
        // independently of the prefix filter; the two thresholds are
        // deliberately separate.
        let line = tokens.join(" ");
        for prev in &self.lines {
            if line_similarity(prev, &line) >= self.config.line_threshold {
                return String::new();
            }
        }

        // Residual overlap trim: longest token run shared with the global
        // history, anchored at the start of the candidate.
        let run = longest_anchored_run(&self.tokens, &tokens);
        if run >= self.config.min_overlap_match {
            tokens.drain(..run);
        }

        // Repetition collapse.
        let tokens = collapse_repeats(tokens, self.config.max_word_repeat);
        let cleaned = tokens.join(" ");
        if cleaned.is_empty() {
            return String::new();
        }

        // State update with the emitted tokens only.
        for token in &tokens {
            push_capped(&mut self.tail, token.clone(), self.config.window_size);
            push_capped(&mut self.tokens, token.clone(), self.config.token_history);
        }
        push_capped(&mut self.lines, cleaned.clone(), self.config.line_history);
        self.last_line = cleaned.clone();

        cleaned
    }
}

fn push_capped<T>(buffer: &mut VecDeque<T>, value: T, cap: usize) {
    if cap == 0 {
        return;
    }
    while buffer.len() >= cap {
        buffer.pop_front();
    }
    buffer.push_back(value);
}
