use crate::chunking::page_marker;
use crate::error::IngestError;
use crate::models::Page;

pub fn group_into_batches(
    pages: &[Page],
    batch_size: usize,
) -> Result<Vec<Vec<Page>>, IngestError> {
    if batch_size == 0 {
        return Err(IngestError::InvalidArgument(
            "batch size must be at least 1".to_string(),
        ));
    }

    Ok(pages.chunks(batch_size).map(<[Page]>::to_vec).collect())
}

pub fn batch_text(batch: &[Page]) -> String {
    batch
        .iter()
        .map(|page| format!("{}\n{}", page_marker(page.page_number), page.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

pub fn page_numbers(batch: &[Page]) -> Vec<u32> {
    batch.iter().map(|page| page.page_number).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(count: u32) -> Vec<Page> {
        (1..=count)
            .map(|number| Page::new(number, format!("text of page {number}")))
            .collect()
    }

    #[test]
    fn seven_pages_in_threes() -> Result<(), IngestError> {
        let batches = group_into_batches(&pages(7), 3)?;
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        Ok(())
    }

    #[test]
    fn batches_reconstruct_the_input() -> Result<(), IngestError> {
        let input = pages(11);
        for batch_size in 1..=12 {
            let batches = group_into_batches(&input, batch_size)?;
            let flattened: Vec<Page> = batches.iter().flatten().cloned().collect();
            assert_eq!(flattened, input);

            let (last, rest) = batches.split_last().ok_or_else(|| {
                IngestError::InvalidArgument("expected at least one batch".to_string())
            })?;
            assert!(rest.iter().all(|batch| batch.len() == batch_size));
            assert!((1..=batch_size).contains(&last.len()));
        }
        Ok(())
    }

    #[test]
    fn empty_input_yields_no_batches() -> Result<(), IngestError> {
        assert!(group_into_batches(&[], 3)?.is_empty());
        Ok(())
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert!(matches!(
            group_into_batches(&pages(2), 0),
            Err(IngestError::InvalidArgument(_))
        ));
    }

    #[test]
    fn batch_text_separates_pages() {
        let text = batch_text(&pages(2));
        assert_eq!(
            text,
            "[Page 1]\ntext of page 1\n\n---\n\n[Page 2]\ntext of page 2"
        );
    }
}
