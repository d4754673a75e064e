use std::collections::VecDeque;
use tracing::{debug, info};

use crate::sources::Track;

/// Cola FIFO de tracks pendientes.
///
/// No tiene sincronización propia: vive dentro de la sesión y solo se toca
/// con el lock de la sesión tomado, así que `dequeue_head` y `clear` nunca se
/// intercalan.
#[derive(Debug, Default)]
pub struct TrackQueue {
    items: VecDeque<Track>,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega un track al final de la cola
    pub fn enqueue(&mut self, track: Track) -> usize {
        info!("➕ Agregado a la cola: {}", track.title());
        self.items.push_back(track);
        self.items.len()
    }

    /// Obtiene el siguiente track (FIFO - First In, First Out)
    pub fn dequeue_head(&mut self) -> Option<Track> {
        let next = self.items.pop_front();
        match &next {
            Some(track) => info!("➡️ Siguiente en cola (FIFO): {}", track.title()),
            None => debug!("📭 Cola vacía, no hay siguiente track"),
        }
        next
    }

    /// Devuelve a la cabeza un track que no se pudo iniciar
    pub fn requeue_front(&mut self, track: Track) {
        debug!("↩️ Devuelto a la cabeza de la cola: {}", track.title());
        self.items.push_front(track);
    }

    pub fn snapshot(&self) -> Vec<Track> {
        self.items.iter().cloned().collect()
    }

    /// Limpia la cola y devuelve cuántos tracks se descartaron
    pub fn clear(&mut self) -> usize {
        let cleared = self.items.len();
        self.items.clear();
        if cleared > 0 {
            info!("🗑️ Cola limpiada: {} tracks removidos", cleared);
        }
        cleared
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn track(n: u8) -> Track {
        Track::new(format!("https://example.com/{n}"), format!("Track {n}"))
    }

    #[test]
    fn test_strict_fifo_order() {
        let mut queue = TrackQueue::new();
        assert_eq!(queue.enqueue(track(1)), 1);
        assert_eq!(queue.enqueue(track(2)), 2);
        assert_eq!(queue.enqueue(track(3)), 3);

        assert_eq!(queue.dequeue_head(), Some(track(1)));
        assert_eq!(queue.dequeue_head(), Some(track(2)));
        assert_eq!(queue.dequeue_head(), Some(track(3)));
        assert_eq!(queue.dequeue_head(), None);
    }

    #[test]
    fn test_snapshot_does_not_mutate() {
        let mut queue = TrackQueue::new();
        queue.enqueue(track(1));
        queue.enqueue(track(2));

        assert_eq!(queue.snapshot(), vec![track(1), track(2)]);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dequeue_head(), Some(track(1)));
    }

    #[test]
    fn test_requeue_front_keeps_order() {
        let mut queue = TrackQueue::new();
        queue.enqueue(track(1));
        queue.enqueue(track(2));

        let head = queue.dequeue_head().unwrap();
        queue.requeue_front(head);

        assert_eq!(queue.snapshot(), vec![track(1), track(2)]);
    }

    #[test]
    fn test_clear() {
        let mut queue = TrackQueue::new();
        queue.enqueue(track(1));
        queue.enqueue(track(2));

        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.clear(), 0);
        assert_eq!(queue.dequeue_head(), None);
    }
}
