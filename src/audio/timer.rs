use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Cuenta regresiva cancelable que fuerza el stop del track actual.
///
/// Como máximo hay un timer vivo: `arm` siempre cancela el anterior.
/// Soltar el timer también lo cancela.
#[derive(Debug, Default)]
pub struct InactivityTimer {
    token: Option<CancellationToken>,
}

impl InactivityTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arma el timer; `on_expire` se ejecuta una sola vez si nadie lo cancela antes.
    pub fn arm<F>(&mut self, duration: Duration, on_expire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();

        let token = CancellationToken::new();
        let task_token = token.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = task_token.cancelled() => {
                    debug!("⏱️ Timer de inactividad cancelado");
                }
                _ = tokio::time::sleep(duration) => {
                    // Marcar como consumido antes de disparar
                    task_token.cancel();
                    on_expire();
                }
            }
        });

        debug!("⏱️ Timer de inactividad armado: {:?}", duration);
        self.token = Some(token);
    }

    /// Idempotente: no falla si ya expiró o ya se canceló
    pub fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.token
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }
}

impl Drop for InactivityTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let fired = Arc::new(AtomicUsize::new(0));
        let handle = fired.clone();
        (fired, move || {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_duration() {
        let (fired, on_expire) = counter();
        let mut timer = InactivityTimer::new();
        timer.arm(Duration::from_secs(300), on_expire);
        assert!(timer.is_armed());

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_armed());

        // Cancelar después de expirar no hace nada
        timer.cancel();
        timer.cancel();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_expiry() {
        let (fired, on_expire) = counter();
        let mut timer = InactivityTimer::new();
        timer.arm(Duration::from_secs(10), on_expire);
        timer.cancel();
        assert!(!timer.is_armed());

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_cancels_previous() {
        let (first, first_expire) = counter();
        let (second, second_expire) = counter();
        let mut timer = InactivityTimer::new();

        timer.arm(Duration::from_secs(10), first_expire);
        tokio::time::sleep(Duration::from_secs(5)).await;
        timer.arm(Duration::from_secs(10), second_expire);

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let (fired, on_expire) = counter();
        {
            let mut timer = InactivityTimer::new();
            timer.arm(Duration::from_secs(1), on_expire);
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
