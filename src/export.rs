//! CSV export of the submission collection for spreadsheet tools.

use crate::models::Submission;

/// UTF-8 byte-order marker so Arabic text renders correctly in Excel.
const BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

const HEADER: [&str; 11] = [
    "الجامعة",
    "النوع",
    "الحالة",
    "اسم الطالب",
    "رقم الطالب",
    "الكلية",
    "الفرقة",
    "البريد الإلكتروني",
    "العنوان",
    "التفاصيل",
    "تاريخ الإرسال",
];

/// Render the collection as a downloadable CSV byte stream. An empty
/// collection yields the BOM plus the header row only.
pub fn to_csv(submissions: &[Submission]) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(BOM.to_vec());
    writer.write_record(HEADER)?;

    for submission in submissions {
        let submitted_at = submission.created_at.format("%Y-%m-%d %H:%M").to_string();
        writer.write_record([
            submission.university.display_name(),
            submission.kind.display_name(),
            submission.status.display_name(),
            submission.student_name.as_str(),
            submission.student_id.as_str(),
            submission.faculty.as_str(),
            submission.year.as_str(),
            submission.email.as_str(),
            submission.title.as_str(),
            submission.content.as_str(),
            submitted_at.as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("flushing CSV export buffer: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SubmissionKind, SubmissionStatus, University};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn sample(title: &str, content: &str) -> Submission {
        Submission {
            id: Uuid::new_v4(),
            student_name: "Ali".to_string(),
            student_id: "123".to_string(),
            faculty: "Eng".to_string(),
            year: "3".to_string(),
            email: "ali@x.com".to_string(),
            kind: SubmissionKind::Suggestion,
            title: title.to_string(),
            content: content.to_string(),
            university: University::Government,
            status: SubmissionStatus::Pending,
            admin_notes: None,
            created_at: Utc.with_ymd_and_hms(2025, 8, 25, 10, 30, 0).unwrap(),
        }
    }

    #[test]
    fn empty_collection_yields_bom_and_header_only() {
        let bytes = to_csv(&[]).unwrap();
        assert_eq!(&bytes[..3], BOM);

        let text = std::str::from_utf8(&bytes[3..]).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("الجامعة,"));
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let submission = sample("quoted", r#"He said "more seats" twice"#);
        let bytes = to_csv(&[submission]).unwrap();
        let text = std::str::from_utf8(&bytes[3..]).unwrap();
        assert!(text.contains(r#""He said ""more seats"" twice""#));
    }

    #[test]
    fn round_trip_recovers_field_values() {
        let submissions = vec![
            sample("More seats", "We need more seats, badly"),
            sample("Wifi", r#"The "study hall" wifi drops"#),
        ];
        let bytes = to_csv(&submissions).unwrap();

        let mut reader = csv::Reader::from_reader(&bytes[3..]);
        let rows: Vec<csv::StringRecord> =
            reader.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(&rows[0][0], "جامعة حلوان الحكومية");
        assert_eq!(&rows[0][1], "اقتراح");
        assert_eq!(&rows[0][2], "قيد المراجعة");
        assert_eq!(&rows[0][3], "Ali");
        assert_eq!(&rows[0][9], "We need more seats, badly");
        assert_eq!(&rows[0][10], "2025-08-25 10:30");
        assert_eq!(&rows[1][9], r#"The "study hall" wifi drops"#);
    }
}
