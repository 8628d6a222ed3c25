use serde::{Deserialize, Serialize};

/// Проекция прогресса импорта для опрашивающего клиента.
///
/// Все поля могут отсутствовать: до первого запуска и после истечения
/// срока хранения состояния.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportProgress {
    /// Сколько позиций выбора уже обработано
    pub indexed: Option<i64>,
    /// Сколько позиций в выборе
    pub total: Option<i64>,
    /// Текст статуса ("Importing Equipment", ...)
    pub text: Option<String>,
}

impl ImportProgress {
    /// Прогон завершён, когда счётчик дошёл до total
    pub fn is_finished(&self) -> bool {
        matches!((self.indexed, self.total), (Some(i), Some(t)) if i == t)
    }

    /// floor(indexed / total * 100); при total = 0 или отсутствии данных 0
    pub fn percent(&self) -> u32 {
        match (self.indexed, self.total) {
            (Some(indexed), Some(total)) if total > 0 && indexed > 0 => {
                ((indexed * 100) / total).min(100) as u32
            }
            _ => 0,
        }
    }

    /// Строка для отображения "{text} - {percent}%".
    ///
    /// None, если отображать нечего (нет ни текста, ни счётчиков).
    pub fn display_line(&self) -> Option<String> {
        if self.text.is_none() && self.total.is_none() && self.indexed.is_none() {
            return None;
        }
        Some(format!(
            "{} - {}%",
            self.text.as_deref().unwrap_or_default(),
            self.percent()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(indexed: Option<i64>, total: Option<i64>, text: &str) -> ImportProgress {
        ImportProgress {
            indexed,
            total,
            text: Some(text.to_string()),
        }
    }

    #[test]
    fn percent_is_floored() {
        assert_eq!(progress(Some(2), Some(8), "Importing").percent(), 25);
        assert_eq!(progress(Some(1), Some(3), "Importing").percent(), 33);
        assert_eq!(progress(Some(5), Some(5), "Importing").percent(), 100);
    }

    #[test]
    fn zero_or_missing_total_renders_zero_percent() {
        let p = progress(Some(0), Some(0), "There isn't any equipment to import");
        assert_eq!(p.percent(), 0);
        assert_eq!(
            p.display_line().as_deref(),
            Some("There isn't any equipment to import - 0%")
        );
        assert_eq!(progress(Some(3), None, "x").percent(), 0);
    }

    #[test]
    fn empty_projection_has_nothing_to_display() {
        let p = ImportProgress::default();
        assert_eq!(p.display_line(), None);
        assert!(!p.is_finished());
    }

    #[test]
    fn finished_when_index_reaches_total() {
        assert!(progress(Some(5), Some(5), "Importing").is_finished());
        assert!(!progress(Some(4), Some(5), "Importing").is_finished());
    }

    #[test]
    fn serializes_as_poll_document() {
        let json = serde_json::to_value(ImportProgress::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"indexed": null, "total": null, "text": null})
        );
    }
}
