pub fn print_list<I>(title: &str, rows: I)
where
    I: IntoIterator<Item = String>,
{
    println!("{title}");

    let mut empty = true;
    for row in rows {
        empty = false;
        println!("- {row}");
    }

    if empty {
        println!("  (nenhum)");
    }
}

pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1000.0 && unit < UNITS.len() - 1 {
        size /= 1000.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
