//! Human vs `--json` output

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

pub fn print_out<T: Serialize>(
    json: bool,
    data: &[T],
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        for d in data {
            println!("{}", row(d));
        }
    }
    Ok(())
}

pub fn print_one<T: Serialize>(
    json: bool,
    data: T,
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        println!("{}", row(&data));
    }
    Ok(())
}

/// Failure envelope for `--json` mode
pub fn print_error(json: bool, kind: &str, message: &str) {
    if json {
        let body = serde_json::json!({
            "ok": false,
            "error": { "kind": kind, "message": message },
        });
        println!("{body}");
    } else {
        eprintln!("Error: {message}");
    }
}
