//! Entity cache: channels and users keyed by ID and by display name.
//!
//! Built once from the `rtm.start` snapshot and never mutated afterwards,
//! so readers share it through an `Arc` without locking.

use std::collections::HashMap;

use crate::types::{Channel, User};

use super::wire::{EntityRecord, RtmStart};

/// Read-only lookup tables for one connection.
#[derive(Debug, Default, Clone)]
pub struct EntityCache {
    channels_by_id: HashMap<String, Channel>,
    channels_by_name: HashMap<String, Channel>,
    users_by_id: HashMap<String, User>,
    users_by_name: HashMap<String, User>,
}

impl EntityCache {
    /// Build the cache from a session-start snapshot.
    ///
    /// Channels, groups and direct-message channels all land in the channel
    /// tables. Duplicate keys are last-write-wins. Records without a name
    /// are only indexed by ID.
    pub fn from_snapshot(start: &RtmStart) -> Self {
        let mut cache = Self::default();

        let channel_records = start
            .channels
            .iter()
            .chain(&start.groups)
            .chain(&start.ims);
        for record in channel_records {
            cache.insert_channel(Channel::new(record.id.clone(), record.name.clone()));
        }

        for EntityRecord { id, name } in &start.users {
            cache.insert_user(User::new(id.clone(), name.clone()));
        }

        cache
    }

    fn insert_channel(&mut self, channel: Channel) {
        if !channel.name.is_empty() {
            self.channels_by_name
                .insert(channel.name.clone(), channel.clone());
        }
        self.channels_by_id.insert(channel.id.clone(), channel);
    }

    fn insert_user(&mut self, user: User) {
        if !user.name.is_empty() {
            self.users_by_name.insert(user.name.clone(), user.clone());
        }
        self.users_by_id.insert(user.id.clone(), user);
    }

    /// Look up a channel by ID.
    pub fn channel(&self, id: &str) -> Option<&Channel> {
        self.channels_by_id.get(id)
    }

    /// Look up a channel by display name.
    pub fn channel_by_name(&self, name: &str) -> Option<&Channel> {
        self.channels_by_name.get(name)
    }

    /// Look up a user by ID.
    pub fn user(&self, id: &str) -> Option<&User> {
        self.users_by_id.get(id)
    }

    /// Look up a user by handle.
    pub fn user_by_name(&self, name: &str) -> Option<&User> {
        self.users_by_name.get(name)
    }

    /// Number of cached channels.
    pub fn channel_count(&self) -> usize {
        self.channels_by_id.len()
    }

    /// Number of cached users.
    pub fn user_count(&self) -> usize {
        self.users_by_id.len()
    }
}
