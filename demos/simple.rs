//! Read a given line of a text file directly

use indexed_lines::ReadByLine;

fn main() -> indexed_lines::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "./testfiles/simple".to_string());

    // Nothing gets indexed yet
    let mut file = indexed_lines::File::open(&path)?;

    // Only indexes the file up to line 3
    if let Some(line) = file.try_line(3)? {
        println!("line 3: {}", String::from_utf8_lossy(&line));
    }

    // Lines known so far, without reading any further
    println!("known lines: {}", file.line_count(false)?);

    // Indexes the rest of the file
    println!("total lines: {}", file.line_count(true)?);

    // The last two lines, newest first
    for line in file.lines(-1, -3)? {
        println!("{}", String::from_utf8_lossy(&line));
    }

    file.close();
    Ok(())
}
