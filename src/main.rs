//! grep-style command line front end for the NFA engine.
//!
//! Reads lines from stdin, files, or a recursive directory walk, prints
//! the ones containing a match, and optionally highlights the matched
//! span.  Exit status follows grep conventions: 0 when anything matched,
//! 1 when nothing did, 2 on usage or pattern errors.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::debug;

use regex_thompson_captures::{Match, Regex, SearchMemory};

mod logger;

/// Bold red, as used for match highlighting by the usual grep tools.
const COLOR_MATCH: &str = "\x1b[1;31m";
const COLOR_RESET: &str = "\x1b[0m";

#[derive(Parser, Debug)]
#[command(version, about = "Search for an extended-regex pattern in files or stdin")]
struct Args {
    /// Pattern to search for (extended regular expression)
    #[arg(short = 'E', value_name = "PATTERN", required = true)]
    pattern: String,

    /// Files or directories to search; stdin when omitted
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Recurse into directories (searches the current directory when no
    /// path is given)
    #[arg(short = 'r', long)]
    recursive: bool,

    /// When to highlight the matched span
    #[arg(long, value_enum, value_name = "WHEN", default_value = "auto")]
    color: ColorWhen,

    /// Print simulation statistics to stderr after the run
    #[arg(long)]
    profile: bool,

    /// Dump the compiled NFA as Graphviz DOT and exit
    #[arg(long)]
    dot: bool,

    /// Enable debug logging
    #[arg(short = 'd', long)]
    debug: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ColorWhen {
    Auto,
    Always,
    Never,
}

fn main() -> ExitCode {
    let args = Args::parse();
    logger::init(args.debug);

    let regex = match Regex::new(&args.pattern) {
        Ok(regex) => regex,
        Err(err) => {
            eprintln!("rgrep: invalid pattern: {}", err);
            return ExitCode::from(2);
        }
    };
    debug!(
        "compiled {} NFA states ({} bytes), anchored={}",
        regex.state_count(),
        regex.memory_size(),
        regex.anchored_at_start()
    );

    if args.dot {
        regex.to_dot(io::stdout().lock());
        return ExitCode::SUCCESS;
    }

    match run(&args, &regex) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("rgrep: {}", err);
            ExitCode::from(2)
        }
    }
}

/// Search every requested input; returns whether any line matched.
fn run(args: &Args, regex: &Regex) -> Result<bool> {
    let color = match args.color {
        ColorWhen::Always => true,
        ColorWhen::Never => false,
        ColorWhen::Auto => io::stdout().is_terminal(),
    };

    let mut memory = SearchMemory::default();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut any = false;

    let mut paths = args.paths.clone();
    if paths.is_empty() && args.recursive {
        paths.push(PathBuf::from("."));
    }

    if paths.is_empty() {
        let stdin = io::stdin();
        any = search_reader(regex, &mut memory, stdin.lock(), None, color, &mut out)?;
    } else {
        let files = collect_files(&paths, args.recursive);
        let prefix_names = files.len() > 1;
        for file in &files {
            debug!("searching {}", file.display());
            let reader = match File::open(file) {
                Ok(f) => BufReader::new(f),
                Err(err) => {
                    eprintln!("rgrep: {}: {}", file.display(), err);
                    continue;
                }
            };
            let label = if prefix_names {
                Some(file.display().to_string())
            } else {
                None
            };
            if search_reader(regex, &mut memory, reader, label.as_deref(), color, &mut out)? {
                any = true;
            }
        }
    }

    out.flush()?;

    if args.profile {
        let stats = memory.stats();
        eprintln!("[simulation profile]");
        eprintln!("  lines searched    : {}", stats.lines_searched);
        eprintln!("  simulation steps  : {}", stats.steps);
        eprintln!("  threads stepped   : {}", stats.threads_stepped);
        eprintln!("  peak live threads : {}", stats.peak_threads);
        eprintln!("  compiled size     : {} bytes", regex.memory_size());
    }

    Ok(any)
}

/// Expand the requested paths into the flat list of files to search.
/// Directories are walked only under `-r`; without it they are skipped
/// with a warning, the way grep does.
fn collect_files(paths: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            if recursive {
                walk_dir(path, &mut files);
            } else {
                eprintln!("rgrep: {}: is a directory (use -r)", path.display());
            }
        } else {
            files.push(path.clone());
        }
    }
    files
}

fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            eprintln!("rgrep: {}: {}", dir.display(), err);
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_dir(&path, files);
        } else {
            files.push(path);
        }
    }
}

/// Feed `reader` line by line through the matcher, printing matching
/// lines.  Lines are byte sequences; the trailing newline is stripped
/// before matching and re-added on output.
fn search_reader(
    regex: &Regex,
    memory: &mut SearchMemory,
    mut reader: impl BufRead,
    label: Option<&str>,
    color: bool,
    out: &mut impl Write,
) -> Result<bool> {
    let mut line = Vec::new();
    let mut any = false;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        if let Some(m) = regex.search_line_with(memory, &line) {
            any = true;
            print_match(out, label, &line, m, color)?;
        }
    }
    Ok(any)
}

/// Write one matching line, optionally with a `file:` prefix and the
/// matched span wrapped in ANSI bold red.
fn print_match(
    out: &mut impl Write,
    label: Option<&str>,
    line: &[u8],
    m: Match,
    color: bool,
) -> io::Result<()> {
    if let Some(label) = label {
        write!(out, "{}:", label)?;
    }
    if color {
        out.write_all(&line[..m.start()])?;
        out.write_all(COLOR_MATCH.as_bytes())?;
        out.write_all(&line[m.range()])?;
        out.write_all(COLOR_RESET.as_bytes())?;
        out.write_all(&line[m.end()..])?;
    } else {
        out.write_all(line)?;
    }
    out.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(pattern: &str, line: &[u8], color: bool) -> String {
        let regex = Regex::new(pattern).unwrap();
        let m = regex.search_line(line).expect("line should match");
        let mut out = Vec::new();
        print_match(&mut out, None, line, m, color).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_print_match_plain() {
        assert_eq!(render("b+", b"abba", false), "abba\n");
    }

    #[test]
    fn test_print_match_highlights_span() {
        assert_eq!(
            render("b+", b"abba", true),
            format!("a{}bb{}a\n", COLOR_MATCH, COLOR_RESET)
        );
    }

    #[test]
    fn test_print_match_zero_width_span() {
        // A zero-width match inserts an empty highlight and keeps the
        // line intact.
        assert_eq!(
            render("x*", b"abc", true),
            format!("{}{}abc\n", COLOR_MATCH, COLOR_RESET)
        );
    }

    #[test]
    fn test_print_match_with_label() {
        let regex = Regex::new("c").unwrap();
        let m = regex.search_line(b"abc").unwrap();
        let mut out = Vec::new();
        print_match(&mut out, Some("notes.txt"), b"abc", m, false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "notes.txt:abc\n");
    }

    #[test]
    fn test_collect_files_recursive_walk() {
        let root = std::env::temp_dir().join(format!("rgrep-walk-test-{}", std::process::id()));
        let nested = root.join("sub");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.join("a.txt"), b"alpha\n").unwrap();
        fs::write(nested.join("b.txt"), b"beta\n").unwrap();

        let mut files = collect_files(&[root.clone()], true);
        files.sort();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.txt", "b.txt"]);

        // Plain files pass through untouched.
        let one = collect_files(&[root.join("a.txt")], false);
        assert_eq!(one, vec![root.join("a.txt")]);

        // Without -r a directory is skipped entirely.
        assert!(collect_files(&[root.clone()], false).is_empty());

        fs::remove_dir_all(&root).unwrap();
    }
}
