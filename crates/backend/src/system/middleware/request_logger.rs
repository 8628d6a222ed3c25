use axum::body::to_bytes;
use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::shared::format::format_size;

/// Middleware для логирования HTTP запросов
///
/// Пишет в лог длительность, размер ответа, статус, метод и путь.
/// Опрос прогресса идёт раз в секунду, поэтому он логируется на уровне debug.
pub async fn request_logger(req: Request<Body>, next: Next) -> Response {
    let start = std::time::Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;
    let (parts, body) = response.into_parts();

    // Читаем тело ответа, чтобы узнать реальный размер
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(
                "{:>5}ms | {:>12} | {} {:>6} {} ({})",
                start.elapsed().as_millis(),
                "error",
                parts.status.as_u16(),
                method,
                path,
                e
            );
            return Response::from_parts(parts, Body::default());
        }
    };

    let size = format_size(bytes.len());
    let duration = start.elapsed().as_millis();
    let status = parts.status.as_u16();

    if path.ends_with("/progress") && parts.status.is_success() {
        tracing::debug!("{:>5}ms | {:>12} | {} {:>6} {}", duration, size, status, method, path);
    } else {
        tracing::info!("{:>5}ms | {:>12} | {} {:>6} {}", duration, size, status, method, path);
    }

    Response::from_parts(parts, Body::from(bytes))
}
