use super::*;
use duel_core::*;
use std::sync::Arc;

/// A player's self-reported rating, published for opponents to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingCard {
    player: ID<Player>,
    rating: Rating,
    #[serde(default)]
    updated_at: Millis,
}

impl RatingCard {
    pub fn key_for(player: ID<Player>) -> String {
        format!("rating:{}", player)
    }
}

impl Document for RatingCard {
    fn key(&self) -> String {
        Self::key_for(self.player)
    }
}

#[derive(Clone)]
pub struct Cards {
    records: Records,
    clock: Arc<dyn Clock>,
}

impl Cards {
    pub fn new(records: Records, clock: Arc<dyn Clock>) -> Self {
        Self { records, clock }
    }
    pub async fn publish(&self, local: ID<Player>, rating: Rating) -> Result<(), StoreError> {
        log::debug!("[rating] publishing {} for {}", rating, local);
        self.records
            .upsert(&RatingCard {
                player: local,
                rating,
                updated_at: self.clock.now(),
            })
            .await
    }
    pub async fn fetch(&self, player: ID<Player>) -> Result<Option<Rating>, StoreError> {
        Ok(self
            .records
            .load::<RatingCard>(&RatingCard::key_for(player))
            .await?
            .map(|card| card.rating))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn published_ratings_are_fetchable() {
        let cards = Cards::new(
            Records::new(Arc::new(MemoryStore::default())),
            Arc::new(SystemClock),
        );
        let (alice, bob) = (ID::default(), ID::default());
        cards.publish(alice, 1516).await.unwrap();
        cards.publish(alice, 1530).await.unwrap();
        assert_eq!(cards.fetch(alice).await.unwrap(), Some(1530));
        assert_eq!(cards.fetch(bob).await.unwrap(), None);
    }
}
