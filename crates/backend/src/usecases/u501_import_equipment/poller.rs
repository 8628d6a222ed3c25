use contracts::usecases::u501_import_equipment::{ImportProgress, ImportResponse};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Запустить импорт на удалённом сервере и опрашивать прогресс раз в секунду.
///
/// Опрос заканчивается, когда завершается сам запрос на импорт, а не когда
/// счётчик доходит до 100%.
pub async fn poll_import<F>(base_url: &str, mut on_progress: F) -> anyhow::Result<ImportResponse>
where
    F: FnMut(&ImportProgress),
{
    let client = reqwest::Client::builder()
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;
    let base = base_url.trim_end_matches('/');
    let import_url = format!("{}/api/u501/import", base);
    let progress_url = format!("{}/api/u501/progress", base);

    let mut trigger = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .post(import_url)
                .send()
                .await?
                .error_for_status()?
                .json::<ImportResponse>()
                .await
        })
    };

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            result = &mut trigger => {
                let response = result??;
                tracing::info!("Import request finished: {}", response.message);
                return Ok(response);
            }
            _ = ticker.tick() => {
                match fetch_progress(&client, &progress_url).await {
                    Ok(progress) => on_progress(&progress),
                    Err(e) => tracing::debug!("Progress poll failed: {}", e),
                }
            }
        }
    }
}

async fn fetch_progress(client: &reqwest::Client, url: &str) -> anyhow::Result<ImportProgress> {
    let progress = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json::<ImportProgress>()
        .await?;
    Ok(progress)
}
