#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use hotham_authority::{
    action::ActionEnvelope,
    components::{
        physics::SharedShape, Collider, EntityUuid, Grabbable, Info, RigidBody, Transform,
    },
    config::SessionConfig,
    glam::Vec3,
    hecs::Entity,
    identity::PeerId,
    Session, SessionBuilder,
};
use uuid::Uuid;

/// A handful of sessions connected by a loopback transport. Every pair of peers is joined by a link
/// that delivers envelopes in the order they were sent, but only when told to: [`Peers::step`]
/// flushes every link, while [`Peers::tick`] and [`Peers::deliver_from`] let a test hold some of
/// them back.
pub struct Peers {
    pub sessions: Vec<Session>,
    links: HashMap<(PeerId, PeerId), VecDeque<ActionEnvelope>>,
    next_peer: u128,
}

impl Peers {
    pub fn new(count: usize) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut peers = Peers {
            sessions: Vec::new(),
            links: HashMap::new(),
            next_peer: 1,
        };
        for _ in 0..count {
            peers.join();
        }
        peers
    }

    /// Connect a new peer. It catches up from the first peer's action cache before any live
    /// traffic. Peers that join later get higher `PeerId`s.
    pub fn join(&mut self) -> usize {
        let config = SessionConfig {
            gravity: [0., 0., 0.],
            ..Default::default()
        };
        let mut session = SessionBuilder::new()
            .local_peer_id(PeerId(Uuid::from_u128(self.next_peer)))
            .config(config)
            .build();
        self.next_peer += 1;

        for other in &mut self.sessions {
            other.peer_joined(session.local_peer_id(), session.local_user_id());
            session.peer_joined(other.local_peer_id(), other.local_user_id());
        }
        if let Some(host) = self.sessions.first() {
            for envelope in host.cached_actions() {
                session.receive(envelope);
            }
        }
        self.sessions.push(session);
        self.sessions.len() - 1
    }

    /// Disconnect a peer, telling everyone else it has gone. Anything still on its links is lost.
    pub fn leave(&mut self, index: usize) -> Session {
        let session = self.sessions.remove(index);
        let peer_id = session.local_peer_id();
        self.links.retain(|(from, to), _| *from != peer_id && *to != peer_id);
        for other in &mut self.sessions {
            other.peer_left(peer_id);
        }
        session
    }

    /// Tick one peer, leaving everything it sends on its links.
    pub fn tick(&mut self, index: usize) {
        self.sessions[index].tick();
        self.send(index);
    }

    /// Move everything waiting in a peer's outgoing queue onto its links.
    fn send(&mut self, index: usize) {
        let from = self.sessions[index].local_peer_id();
        for envelope in self.sessions[index].drain_outgoing() {
            for (to, session) in self.sessions.iter().enumerate() {
                if to != index {
                    self.links
                        .entry((from, session.local_peer_id()))
                        .or_default()
                        .push_back(envelope.clone());
                }
            }
        }
    }

    /// Deliver everything on the link from one peer to another, leaving every other link alone.
    pub fn deliver_from(&mut self, from: usize, to: usize) {
        self.send(from);
        let key = (
            self.sessions[from].local_peer_id(),
            self.sessions[to].local_peer_id(),
        );
        if let Some(link) = self.links.get_mut(&key) {
            for envelope in link.drain(..) {
                self.sessions[to].receive(envelope);
            }
        }
    }

    /// Deliver everything on the links between two peers, in both directions.
    pub fn deliver_between(&mut self, a: usize, b: usize) {
        self.deliver_from(a, b);
        self.deliver_from(b, a);
    }

    /// Deliver everything every peer has sent, including anything held back so far.
    pub fn deliver(&mut self) {
        for from in 0..self.sessions.len() {
            for to in 0..self.sessions.len() {
                if from != to {
                    self.deliver_from(from, to);
                }
            }
        }
    }

    /// Tick every peer once, then deliver what they sent.
    pub fn step(&mut self) {
        for session in &mut self.sessions {
            session.tick();
        }
        self.deliver();
    }

    /// Step until everything in flight has been applied and reacted to.
    pub fn settle(&mut self) {
        for _ in 0..20 {
            self.step();
        }
    }

    pub fn entity(&self, index: usize, entity_uuid: EntityUuid) -> Entity {
        self.sessions[index]
            .entity(entity_uuid)
            .expect("entity should have been spawned")
    }

    pub fn avatar(&self, index: usize) -> Entity {
        self.sessions[index]
            .local_avatar()
            .expect("avatar should have been spawned")
    }

    /// The entity for another peer's avatar, as seen by `index`.
    pub fn avatar_of(&self, index: usize, other: usize) -> Entity {
        let user_id = self.sessions[other].local_user_id();
        self.entity(index, EntityUuid::for_avatar(user_id))
    }

    /// Give a spawned object everything it needs to be picked up, on every peer that knows about
    /// it.
    pub fn make_grabbable(&mut self, entity_uuid: EntityUuid) {
        for session in &mut self.sessions {
            let Some(entity) = session.entity(entity_uuid) else {
                continue;
            };
            if session.world.get::<&Grabbable>(entity).is_ok() {
                continue;
            }
            session
                .world
                .insert(entity, (Grabbable, RigidBody::dynamic(), cube_collider()))
                .unwrap();
        }
    }

    /// Load the same grabbable tree into every peer's scene.
    pub fn load_tree(&mut self, translation: Vec3) -> EntityUuid {
        let entity_uuid = EntityUuid::new_v4();
        for session in &mut self.sessions {
            let tree = session.world.spawn((
                Transform::from_translation(translation),
                Info::new("Tree"),
                Grabbable,
                RigidBody::dynamic(),
                cube_collider(),
            ));
            session.register_scene_object(tree, entity_uuid).unwrap();
        }
        entity_uuid
    }
}

pub fn cube_collider() -> Collider {
    Collider::new(SharedShape::cuboid(0.1, 0.1, 0.1))
}
