//! CSV rendering for the admin export endpoints.
use axum::http::header;
use axum::response::{IntoResponse, Response};

/// `1234` cents -> `"12.34"`.
pub fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub struct Csv {
    out: String,
}

impl Csv {
    pub fn new(headers: &[&str]) -> Self {
        let mut csv = Self { out: String::new() };
        csv.row(headers.iter().map(|h| h.to_string()));
        csv
    }

    pub fn row<I>(&mut self, fields: I)
    where
        I: IntoIterator<Item = String>,
    {
        let line: Vec<String> = fields.into_iter().map(|f| escape(&f)).collect();
        self.out.push_str(&line.join(","));
        self.out.push_str("\r\n");
    }

    pub fn into_string(self) -> String {
        self.out
    }

    pub fn into_download(self, file_name: &str) -> Response {
        (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{file_name}\""),
                ),
            ],
            self.out,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts() {
        assert_eq!(format_amount(3240), "32.40");
        assert_eq!(format_amount(5), "0.05");
        assert_eq!(format_amount(-360), "-3.60");
    }

    #[test]
    fn quotes_only_when_needed() {
        let mut csv = Csv::new(&["name", "note"]);
        csv.row(["Dal, Rice".to_string(), "say \"hi\"".to_string()]);
        csv.row(["Naan".to_string(), String::new()]);
        assert_eq!(
            csv.into_string(),
            "name,note\r\n\"Dal, Rice\",\"say \"\"hi\"\"\"\r\nNaan,\r\n"
        );
    }
}
