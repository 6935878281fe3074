use std::path::{Path, PathBuf};

/// One file's slice of a unified diff, borrowed from the input text.
///
/// A section starts at a `diff --git` header and runs up to the next one.
/// Diffs without git headers (`diff -u`, `svn diff`) are split at each
/// `---`/`+++` header pair that sits outside a hunk. Text before the first
/// header becomes a preamble section with no paths. Concatenating every
/// section's `text` in order reproduces the input exactly.
///
/// # Examples
///
/// ```
/// use scribe_difflens::parser::split_sections;
///
/// let diff = "diff --git a/hello.rs b/hello.rs\n\
///             --- a/hello.rs\n\
///             +++ b/hello.rs\n\
///             @@ -1,3 +1,4 @@\n\
///              fn main() {\n\
///             +    println!(\"hello\");\n\
///              }\n";
/// let sections = split_sections(diff);
/// assert_eq!(sections.len(), 1);
/// assert_eq!(sections[0].text, diff);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSection<'a> {
    /// Raw text of the section, headers included.
    pub text: &'a str,
    /// Path in the old version, if the section names one.
    pub old_path: Option<PathBuf>,
    /// Path in the new version, if the section names one.
    pub new_path: Option<PathBuf>,
}

impl<'a> FileSection<'a> {
    fn starting_at(text: &'a str) -> Self {
        Self {
            text,
            old_path: None,
            new_path: None,
        }
    }

    /// `true` for text that precedes the first file header.
    pub fn is_preamble(&self) -> bool {
        self.old_path.is_none() && self.new_path.is_none()
    }

    /// The path that best identifies the file: the new path, or the old
    /// one when the file was deleted.
    pub fn path(&self) -> Option<&Path> {
        let new = self.new_path.as_deref().filter(|p| !is_dev_null(p));
        let old = self.old_path.as_deref().filter(|p| !is_dev_null(p));
        new.or(old)
    }

    /// Every real path the section touches (both sides of a rename).
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.old_path
            .iter()
            .chain(self.new_path.iter())
            .map(PathBuf::as_path)
            .filter(|p| !is_dev_null(p))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Preamble,
    /// Opened by `diff --git`; only that line starts the next section.
    Git,
    /// Opened by a bare `---`/`+++` pair.
    Plain,
}

/// Where the scanner is relative to hunk bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hunk {
    Outside,
    /// Lines still owed to the old and new side, from the `@@` header.
    Counted { old: u32, new: u32 },
    /// Inside a hunk whose length is unknown.
    Open,
}

impl Hunk {
    fn starting(line: &str) -> Self {
        match hunk_lengths(line) {
            Some((0, 0)) => Hunk::Outside,
            Some((old, new)) => Hunk::Counted { old, new },
            None => Hunk::Open,
        }
    }

    /// Account for one body line of a counted hunk.
    fn advance(self, line: &str) -> Self {
        let Hunk::Counted { mut old, mut new } = self else {
            return self;
        };
        match line.as_bytes().first() {
            None | Some(b' ') => {
                old = old.saturating_sub(1);
                new = new.saturating_sub(1);
            }
            Some(b'-') => old = old.saturating_sub(1),
            Some(b'+') => new = new.saturating_sub(1),
            Some(b'\\') => {}
            Some(_) => return Hunk::Outside,
        }
        if old == 0 && new == 0 {
            Hunk::Outside
        } else {
            Hunk::Counted { old, new }
        }
    }
}

/// Split a unified diff (as produced by `git diff --staged`) into per-file
/// [`FileSection`]s.
///
/// This never fails: any text is accepted, and text that is not a diff ends
/// up in a single preamble section.
///
/// # Examples
///
/// ```
/// use scribe_difflens::parser::split_sections;
///
/// assert!(split_sections("").is_empty());
///
/// let plain = "--- a/uv.lock\n+++ b/uv.lock\n@@ -1 +1 @@\n-a\n+b\n\
///              --- a/main.py\n+++ b/main.py\n@@ -0,0 +1 @@\n+print(1)\n";
/// let sections = split_sections(plain);
/// assert_eq!(sections.len(), 2);
/// assert!(sections[1].text.starts_with("--- a/main.py"));
/// ```
pub fn split_sections(input: &str) -> Vec<FileSection<'_>> {
    let mut sections = Vec::new();
    let mut start = 0;
    let mut offset = 0;
    let mut current = FileSection::starting_at("");
    let mut kind = SectionKind::Preamble;
    let mut hunk = Hunk::Outside;
    let mut lines = input.split_inclusive('\n').peekable();

    while let Some(raw_line) = lines.next() {
        let line = trim_eol(raw_line);

        if let Some(rest) = line.strip_prefix("diff --git ") {
            if offset > start {
                current.text = &input[start..offset];
                sections.push(current);
            }
            start = offset;
            current = FileSection::starting_at("");
            kind = SectionKind::Git;
            hunk = Hunk::Outside;
            if let Some((old, new)) = split_header_paths(rest) {
                current.old_path = Some(old);
                current.new_path = Some(new);
            }
            offset += raw_line.len();
            continue;
        }

        if kind != SectionKind::Git {
            let header_pair = match hunk {
                Hunk::Counted { .. } => None,
                Hunk::Outside | Hunk::Open => line.strip_prefix("--- ").and_then(|old| {
                    let next = trim_eol(lines.peek()?);
                    let new = next.strip_prefix("+++ ")?;
                    Some((parse_path(old), parse_path(new)))
                }),
            };
            if let Some((old, new)) = header_pair {
                if offset > start {
                    current.text = &input[start..offset];
                    sections.push(current);
                }
                start = offset;
                current = FileSection::starting_at("");
                current.old_path = Some(old);
                current.new_path = Some(new);
                kind = SectionKind::Plain;
                hunk = Hunk::Outside;
                offset += raw_line.len();
                if let Some(next) = lines.next() {
                    offset += next.len();
                }
                continue;
            }
        }

        offset += raw_line.len();

        if line.starts_with("@@ ") {
            hunk = match kind {
                SectionKind::Git => Hunk::Open,
                SectionKind::Preamble | SectionKind::Plain => Hunk::starting(line),
            };
            continue;
        }
        if hunk != Hunk::Outside {
            hunk = hunk.advance(line);
            continue;
        }
        if kind != SectionKind::Git {
            continue;
        }

        if let Some(path) = line.strip_prefix("rename from ") {
            current.old_path = Some(PathBuf::from(path.trim_matches('"')));
        } else if let Some(path) = line.strip_prefix("rename to ") {
            current.new_path = Some(PathBuf::from(path.trim_matches('"')));
        } else if let Some(path) = line.strip_prefix("--- ") {
            current.old_path = Some(parse_path(path));
        } else if let Some(path) = line.strip_prefix("+++ ") {
            current.new_path = Some(parse_path(path));
        }
    }

    if offset > start {
        current.text = &input[start..offset];
        sections.push(current);
    }

    sections
}

fn trim_eol(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

/// Old and new line counts from a `@@ -a,b +c,d @@` header.
fn hunk_lengths(line: &str) -> Option<(u32, u32)> {
    let rest = line.strip_prefix("@@ -")?;
    let (old, rest) = rest.split_once(" +")?;
    let (new, _) = rest.split_once(" @@")?;
    Some((range_length(old)?, range_length(new)?))
}

fn range_length(range: &str) -> Option<u32> {
    match range.split_once(',') {
        Some((_, len)) => len.parse().ok(),
        None => range.parse::<u32>().ok().map(|_| 1),
    }
}

fn is_dev_null(path: &Path) -> bool {
    path == Path::new("/dev/null")
}

fn parse_path(raw: &str) -> PathBuf {
    // `--- a/file\t2024-01-01 ...` timestamps appear in non-git patches
    let raw = raw.split('\t').next().unwrap_or(raw);
    let normalized = raw.trim_matches('"');

    if normalized == "/dev/null" {
        return PathBuf::from("/dev/null");
    }

    let stripped = normalized
        .strip_prefix("a/")
        .or_else(|| normalized.strip_prefix("b/"))
        .unwrap_or(normalized);

    PathBuf::from(stripped)
}

/// Split the `a/old b/new` tail of a `diff --git` line.
fn split_header_paths(rest: &str) -> Option<(PathBuf, PathBuf)> {
    if rest.starts_with('"') {
        let close = rest[1..].find('"')? + 2;
        let (old, new) = rest.split_at(close);
        return Some((parse_path(old), parse_path(new.trim_start())));
    }

    // Unrenamed files have identical halves, which also copes with spaces.
    if rest.len() % 2 == 1 {
        let mid = rest.len() / 2;
        if rest.as_bytes()[mid] == b' ' {
            let (old, new) = (&rest[..mid], &rest[mid + 1..]);
            if old.strip_prefix("a/") == new.strip_prefix("b/") {
                return Some((parse_path(old), parse_path(new)));
            }
        }
    }

    let split = rest.rfind(" b/")?;
    Some((parse_path(&rest[..split]), parse_path(&rest[split + 1..])))
}
