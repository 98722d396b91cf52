//! Follow a growing file and print every line appended to it

use std::time::Duration;

use indexed_lines::{AsyncReadByLine, File, Indexable, SharedReader};

#[async_std::main]
async fn main() -> indexed_lines::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "./testfiles/simple".to_string());

    let shared = SharedReader::new(File::open(&path)?);
    let _refresh = shared.follow(Duration::from_millis(250));

    let mut printed = 0;
    loop {
        // A last line without newline may still be written to
        let known = shared.with_reader(|reader| Ok(reader.get_index().complete_lines()))?;
        for line in printed..known {
            println!("{}", String::from_utf8_lossy(&shared.line(line).await?));
        }
        printed = known;

        async_std::task::sleep(Duration::from_millis(250)).await;
    }
}
