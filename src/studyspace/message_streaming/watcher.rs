use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use super::timeline::MessageTimeline;
use super::types::GroupMessageWatch;
use crate::studyspace::Studyspace;
use crate::studyspace::error::{Result, StudyspaceError};
use crate::studyspace::groups::Group;
use crate::studyspace::messages::Message;

impl Studyspace {
    /// Opens a live view of a group's messages.
    ///
    /// The returned watch starts from a full fetch and is then kept current
    /// by two feeds: push notifications for messages sent through this
    /// instance, and a periodic full refresh. Pushes only ever add; the
    /// refresh is authoritative and replaces the view wholesale, so rows
    /// deleted behind the watch disappear too. Each message appears exactly
    /// once and snapshots are always in ascending timestamp order.
    pub async fn watch_group_messages(&self, group_id: &Uuid) -> Result<GroupMessageWatch> {
        Group::find_by_id(group_id, &self.database)
            .await?
            .ok_or(StudyspaceError::GroupNotFound)?;

        let mut timeline = MessageTimeline::new();
        timeline.replace(Message::for_group(group_id, &self.database).await?);

        let (snapshot_tx, snapshot_rx) = watch::channel(timeline.snapshot());
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let mut pushes = self.group_streams.attach(group_id);

        let database = self.database.clone();
        let streams = self.group_streams.clone();
        let group_id = *group_id;
        let refresh_interval = self.config.refresh_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(refresh_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick fires immediately; the initial fetch already
            // covered it.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        match Message::for_group(&group_id, &database).await {
                            Ok(batch) => {
                                if timeline.replace(batch) && snapshot_tx.send(timeline.snapshot()).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::warn!(
                                    target: "studyspace::message_streaming",
                                    "Refresh failed for group {}, retrying next tick: {}",
                                    group_id,
                                    e,
                                );
                            }
                        }
                    }
                    push = pushes.recv() => {
                        match push {
                            Ok(push) if push.group_id == group_id => {
                                match Message::find_by_id(&push.message_id, &database).await {
                                    Ok(Some(message)) => {
                                        if timeline.insert(message) && snapshot_tx.send(timeline.snapshot()).is_err() {
                                            break;
                                        }
                                    }
                                    Ok(None) => {
                                        tracing::debug!(
                                            target: "studyspace::message_streaming",
                                            "Push referenced unknown message {}",
                                            push.message_id,
                                        );
                                    }
                                    Err(e) => {
                                        tracing::warn!(
                                            target: "studyspace::message_streaming",
                                            "Failed to fetch pushed message {}: {}",
                                            push.message_id,
                                            e,
                                        );
                                    }
                                }
                            }
                            Ok(_) => {}
                            Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                                // Dropped pushes are recovered by an immediate
                                // full refresh instead of replayed one by one.
                                tracing::debug!(
                                    target: "studyspace::message_streaming",
                                    "Push stream lagged by {} for group {}, refreshing",
                                    missed,
                                    group_id,
                                );
                                if let Ok(batch) = Message::for_group(&group_id, &database).await
                                    && timeline.replace(batch)
                                    && snapshot_tx.send(timeline.snapshot()).is_err()
                                {
                                    break;
                                }
                            }
                            Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                                pushes = streams.attach(&group_id);
                            }
                        }
                    }
                }
            }

            tracing::debug!(
                target: "studyspace::message_streaming",
                "Watch for group {} stopped",
                group_id,
            );
        });

        Ok(GroupMessageWatch {
            snapshots: snapshot_rx,
            shutdown: shutdown_tx,
            handle: Some(handle),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::studyspace::test_utils::*;

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn watch_unknown_group_is_not_found() {
        let (studyspace, _d, _l) = create_mock_studyspace().await;

        let result = studyspace.watch_group_messages(&Uuid::new_v4()).await;

        assert!(matches!(result, Err(StudyspaceError::GroupNotFound)));
    }

    #[tokio::test]
    async fn watch_starts_from_existing_messages() {
        let (studyspace, _d, _l) = create_mock_studyspace().await;
        let user = studyspace.create_user("Alice", None).await.unwrap();
        let group = studyspace.create_group("History", &user.id).await.unwrap();
        studyspace
            .send_message(&group.id, &user.id, "first")
            .await
            .unwrap();

        let watch = studyspace.watch_group_messages(&group.id).await.unwrap();

        let messages = watch.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "first");
        watch.stop().await;
    }

    #[tokio::test]
    async fn push_updates_watch_without_waiting_for_refresh() {
        let (studyspace, _d, _l) = create_mock_studyspace().await;
        let user = studyspace.create_user("Alice", None).await.unwrap();
        let group = studyspace.create_group("Physics", &user.id).await.unwrap();

        let mut watch = studyspace.watch_group_messages(&group.id).await.unwrap();
        assert!(watch.messages().is_empty());

        studyspace
            .send_message(&group.id, &user.id, "hello")
            .await
            .unwrap();

        let snapshot = timeout(WAIT, watch.changed())
            .await
            .expect("watch should update")
            .expect("watch task should be running");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].content, "hello");
        assert_eq!(snapshot[0].author_name.as_deref(), Some("Alice"));
        watch.stop().await;
    }

    #[tokio::test]
    async fn refresh_picks_up_messages_written_behind_the_push_feed() {
        let (studyspace, _d, _l) = create_mock_studyspace().await;
        let user = studyspace.create_user("Alice", None).await.unwrap();
        let group = studyspace.create_group("Biology", &user.id).await.unwrap();

        let mut watch = studyspace.watch_group_messages(&group.id).await.unwrap();

        // Written directly, so no push is emitted and only the periodic
        // refresh can surface it.
        Message::create(&group.id, &user.id, "out of band", &studyspace.database)
            .await
            .unwrap();

        let snapshot = timeout(WAIT, watch.changed())
            .await
            .expect("refresh should pick the message up")
            .expect("watch task should be running");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].content, "out of band");
        watch.stop().await;
    }

    #[tokio::test]
    async fn push_and_refresh_never_duplicate_a_message() {
        let (studyspace, _d, _l) = create_mock_studyspace().await;
        let user = studyspace.create_user("Alice", None).await.unwrap();
        let group = studyspace.create_group("Chem Lab", &user.id).await.unwrap();

        let mut watch = studyspace.watch_group_messages(&group.id).await.unwrap();
        studyspace
            .send_message(&group.id, &user.id, "once")
            .await
            .unwrap();
        timeout(WAIT, watch.changed())
            .await
            .expect("push should arrive")
            .expect("watch task should be running");

        // Sit through several refresh cycles; the same row keeps coming back
        // from the database and must stay deduplicated.
        tokio::time::sleep(mock_refresh_interval() * 4).await;

        let messages = watch.messages();
        assert_eq!(messages.len(), 1);
        watch.stop().await;
    }

    #[tokio::test]
    async fn snapshots_stay_in_ascending_order() {
        let (studyspace, _d, _l) = create_mock_studyspace().await;
        let user = studyspace.create_user("Alice", None).await.unwrap();
        let group = studyspace.create_group("Ordering", &user.id).await.unwrap();

        let mut watch = studyspace.watch_group_messages(&group.id).await.unwrap();
        for i in 0..5 {
            studyspace
                .send_message(&group.id, &user.id, &format!("msg {i}"))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let mut snapshot = watch.messages();
        while snapshot.len() < 5 {
            snapshot = timeout(WAIT, watch.changed())
                .await
                .expect("all sends should arrive")
                .expect("watch task should be running");
        }
        for window in snapshot.windows(2) {
            assert!(window[0].created_at <= window[1].created_at);
        }
        watch.stop().await;
    }

    #[tokio::test]
    async fn two_watchers_converge_on_the_same_timeline() {
        let (studyspace, _d, _l) = create_mock_studyspace().await;
        let creator = studyspace.create_user("Creator", None).await.unwrap();
        let joiner = studyspace.create_user("Joiner", None).await.unwrap();
        let group = studyspace
            .create_group("Algorithms101", &creator.id)
            .await
            .unwrap();
        studyspace
            .join_group(group.join_key.as_str(), &joiner.id)
            .await
            .unwrap();

        let mut creator_watch = studyspace.watch_group_messages(&group.id).await.unwrap();
        let mut joiner_watch = studyspace.watch_group_messages(&group.id).await.unwrap();

        studyspace
            .send_message(&group.id, &joiner.id, "anyone solved problem 3?")
            .await
            .unwrap();

        let creator_view = timeout(WAIT, creator_watch.changed())
            .await
            .expect("creator's watch should update")
            .expect("watch task should be running");
        let joiner_view = timeout(WAIT, joiner_watch.changed())
            .await
            .expect("joiner's watch should update")
            .expect("watch task should be running");

        assert_eq!(creator_view, joiner_view);
        assert_eq!(creator_view.len(), 1);
        assert_eq!(creator_view[0].author_name.as_deref(), Some("Joiner"));
        creator_watch.stop().await;
        joiner_watch.stop().await;
    }

    #[tokio::test]
    async fn refresh_drops_messages_deleted_behind_the_watch() {
        let (studyspace, _d, _l) = create_mock_studyspace().await;
        let user = studyspace.create_user("Alice", None).await.unwrap();
        let group = studyspace.create_group("Ephemeral", &user.id).await.unwrap();
        studyspace
            .send_message(&group.id, &user.id, "soon gone")
            .await
            .unwrap();

        let mut watch = studyspace.watch_group_messages(&group.id).await.unwrap();
        assert_eq!(watch.messages().len(), 1);

        studyspace.delete_all_data().await.unwrap();

        let snapshot = timeout(WAIT, watch.changed())
            .await
            .expect("refresh should notice the deletion")
            .expect("watch task should be running");
        assert!(snapshot.is_empty());
        watch.stop().await;
    }

    #[tokio::test]
    async fn stop_releases_the_push_subscription() {
        let (studyspace, _d, _l) = create_mock_studyspace().await;
        let user = studyspace.create_user("Alice", None).await.unwrap();
        let group = studyspace.create_group("Cleanup", &user.id).await.unwrap();

        let watch = studyspace.watch_group_messages(&group.id).await.unwrap();
        assert_eq!(studyspace.group_streams.watch_count(&group.id), 1);

        watch.stop().await;

        assert_eq!(studyspace.group_streams.watch_count(&group.id), 0);
    }

    #[tokio::test]
    async fn drop_releases_the_push_subscription() {
        let (studyspace, _d, _l) = create_mock_studyspace().await;
        let user = studyspace.create_user("Alice", None).await.unwrap();
        let group = studyspace.create_group("Dropped", &user.id).await.unwrap();

        let watch = studyspace.watch_group_messages(&group.id).await.unwrap();
        drop(watch);
        // Abort is asynchronous; give the runtime a beat to reap the task.
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(studyspace.group_streams.watch_count(&group.id), 0);
    }
}
