//! Downloadable CSV template for bulk uploads.

use super::csv::{
    ACCESS_TIER_COLUMN, INSTANCE_NAME_COLUMN, NOTES_COLUMN, SYSTEM_NAME_COLUMN, USER_EMAIL_COLUMN,
};

/// Builds the upload template: the header row plus one illustrative
/// example row, using the same column set the parser recognizes.
#[must_use]
pub fn csv_template() -> String {
    format!(
        "{USER_EMAIL_COLUMN},{SYSTEM_NAME_COLUMN},{INSTANCE_NAME_COLUMN},{ACCESS_TIER_COLUMN},{NOTES_COLUMN}\n\
         jane.doe@example.com,Billing,Production,Read Only,\"Quarterly access review, approved\"\n"
    )
}

#[cfg(test)]
mod tests {
    use super::csv_template;

    #[test]
    fn template_parses_under_the_row_parser() {
        let outcome = crate::bulk_import_service::csv::parse(&csv_template());

        assert!(outcome.batch_errors.is_empty());
        assert!(outcome.row_errors.is_empty());
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(
            outcome.rows[0].input.notes.as_deref(),
            Some("Quarterly access review, approved")
        );
    }
}
