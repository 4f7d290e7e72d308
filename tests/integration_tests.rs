//! Integration tests for the multiplayer world server
//!
//! These tests validate cross-component behavior: the wire protocol over a
//! real UDP socket, the deterministic world contract, and full session
//! scenarios driven through the registry, router and command processor.

use bincode::{deserialize, serialize};
use shared::{MessageKind, Packet, Vec3, WorldConfig};
use std::net::UdpSocket;
use std::thread;
use std::time::Duration;
use tokio::time::sleep;

/// NETWORK PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// Tests packet serialization round-trip for protocol validation
    #[tokio::test]
    async fn packet_serialization_roundtrip() {
        let test_packets = vec![
            Packet::Connect { client_version: 1 },
            Packet::Init {
                nick: "Runner".to_string(),
            },
            Packet::Move {
                x: 1.0,
                y: -24.0,
                z: -50.0,
            },
            Packet::Audio {
                buffer: vec![0xDE, 0xAD, 0xBE, 0xEF],
            },
            Packet::RequestRespawn,
            Packet::Chat {
                text: "/help".to_string(),
            },
            Packet::Disconnect,
        ];

        for packet in test_packets {
            let serialized = serialize(&packet).unwrap();
            let deserialized: Packet = deserialize(&serialized).unwrap();

            match (&packet, &deserialized) {
                (Packet::Connect { .. }, Packet::Connect { .. }) => {}
                (Packet::Init { .. }, Packet::Init { .. }) => {}
                (Packet::Move { .. }, Packet::Move { .. }) => {}
                (Packet::Audio { .. }, Packet::Audio { .. }) => {}
                (Packet::RequestRespawn, Packet::RequestRespawn) => {}
                (Packet::Chat { .. }, Packet::Chat { .. }) => {}
                (Packet::Disconnect, Packet::Disconnect) => {}
                _ => panic!("Packet type mismatch after serialization"),
            }
        }
    }

    /// Tests real UDP socket communication with protocol packets
    #[tokio::test]
    async fn udp_socket_communication() {
        let server_socket = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind server socket");
        let server_addr = server_socket.local_addr().unwrap();

        // Echo server
        let server_socket_clone = server_socket.try_clone().unwrap();
        thread::spawn(move || {
            let mut buf = [0; 1024];
            if let Ok((size, client_addr)) = server_socket_clone.recv_from(&mut buf) {
                let _ = server_socket_clone.send_to(&buf[..size], client_addr);
            }
        });

        sleep(Duration::from_millis(10)).await;

        let client_socket = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind client socket");
        client_socket
            .set_read_timeout(Some(Duration::from_millis(100)))
            .unwrap();

        let test_packet = Packet::Init {
            nick: "Echo".to_string(),
        };
        let serialized = serialize(&test_packet).unwrap();

        client_socket.send_to(&serialized, server_addr).unwrap();

        let mut buf = [0; 1024];
        let (size, _) = client_socket.recv_from(&mut buf).unwrap();
        let received_packet: Packet = deserialize(&buf[..size]).unwrap();

        match received_packet {
            Packet::Init { nick } => assert_eq!(nick, "Echo"),
            _ => panic!("Wrong packet type received"),
        }
    }

    /// Malformed datagrams must fail decoding instead of panicking
    #[test]
    fn malformed_packet_handling() {
        let valid = serialize(&Packet::RequestRespawn).unwrap();

        let truncated = &valid[..valid.len() - 1];
        let result: Result<Packet, _> = deserialize(truncated);
        assert!(result.is_err(), "Should fail on truncated packet");

        let result: Result<Packet, _> = deserialize(&[0xFF; 16]);
        assert!(result.is_err(), "Should fail on corrupted packet");

        let result: Result<Packet, _> = deserialize(&[]);
        assert!(result.is_err(), "Should fail on empty packet");
    }
}

/// WORLD GENERATION CONTRACT TESTS
mod world_tests {
    use super::*;
    use server::world::{PlatformType, WorldGenerator};

    /// Two independent generators must agree on every platform, which is
    /// what lets clients reconstruct the world from the config blob alone
    #[test]
    fn generators_agree_across_instances() {
        let gen_a = WorldGenerator::new(WorldConfig::default());
        let gen_b = WorldGenerator::new(WorldConfig::default());

        for index in 0..5000 {
            assert_eq!(gen_a.position_of(index), gen_b.position_of(index));
            assert_eq!(gen_a.type_of(index), gen_b.type_of(index));
        }
    }

    #[test]
    fn spawn_platform_is_fixed() {
        let gen = WorldGenerator::new(WorldConfig::default());
        assert_eq!(gen.type_of(0), PlatformType::Spawn);
        assert_eq!(gen.position_of(0), Vec3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn early_platforms_are_safe() {
        let gen = WorldGenerator::new(WorldConfig::default());
        for index in 1..10 {
            assert_eq!(gen.type_of(index), PlatformType::Normal);
        }
    }
}

/// FULL SESSION SCENARIO TESTS
mod scenario_tests {
    use super::*;
    use server::commands;
    use server::game::GameState;
    use server::router::{self, Directive};
    use server::session::SessionManager;

    fn setup(nicks: &[&str]) -> (SessionManager, GameState) {
        let mut sessions = SessionManager::new(16);
        let mut game = GameState::new(WorldConfig::default());

        for (i, nick) in nicks.iter().enumerate() {
            let addr = format!("127.0.0.1:{}", 9100 + i).parse().unwrap();
            let id = sessions.add_session(addr).unwrap();
            game.init_player(id, nick, 0);
        }
        (sessions, game)
    }

    /// HTML-hostile nick, distance accounting, and three-player
    /// proximity audio
    #[test]
    fn nick_distance_and_audio_scenario() {
        let (_sessions, mut game) = setup(&["<script>", "B", "C"]);

        // Player A's nick is stored escaped
        assert_eq!(game.players.get(&1).unwrap().nick, "&lt;script&gt;");

        // A moves down to y=-50 from start y=1.7 and is told distance 51
        assert_eq!(game.apply_move(1, 0.0, -50.0, 0.0), Some(51));

        // B is within audio range of A; C is far away
        game.apply_move(2, 30.0, -50.0, 0.0); // dist_sq(A,B) = 900
        game.apply_move(3, 500.0, -50.0, 0.0); // dist_sq(A,C) huge

        let directives = router::route_audio(&game.players, 2, vec![1, 2, 3]);
        assert_eq!(directives.len(), 1);
        match &directives[0] {
            Directive::Send {
                to,
                packet: Packet::AudioFrame { id, .. },
            } => {
                assert_eq!(*to, 1, "only A is in range of B");
                assert_eq!(*id, 2);
            }
            _ => panic!("Expected a single audio directive"),
        }
    }

    /// Admin gating before and after /login
    #[test]
    fn admin_login_flow() {
        let (mut sessions, mut game) = setup(&["Admin"]);

        let denied = commands::handle_chat(1, "/fly", &mut sessions, &mut game, "secret", 0);
        match &denied[0] {
            Directive::Send {
                packet: Packet::Message { msg, kind, .. },
                ..
            } => {
                assert!(msg.contains("permission"));
                assert_eq!(*kind, MessageKind::System);
            }
            _ => panic!("Expected permission denial"),
        }

        commands::handle_chat(1, "/login secret", &mut sessions, &mut game, "secret", 0);
        assert!(sessions.is_admin(1));

        let granted = commands::handle_chat(1, "/fly", &mut sessions, &mut game, "secret", 0);
        assert!(matches!(
            granted[0],
            Directive::Send {
                to: 1,
                packet: Packet::SetFly { enabled: true }
            }
        ));
    }

    /// Respawn gating across the full request path
    #[test]
    fn respawn_request_flow() {
        let (_sessions, mut game) = setup(&["Runner"]);
        game.apply_move(1, 0.0, -120.0, 0.0);

        let t0 = 50_000;
        let first = commands::respawn(1, &mut game, t0);
        assert!(first
            .iter()
            .any(|d| matches!(d, Directive::ScheduleCooldown { session_id: 1 })));
        assert_eq!(game.players.get(&1).unwrap().distance_traveled, 0.0);

        // 2999ms later the request is rejected with a 1 second wait
        let rejected = commands::respawn(1, &mut game, t0 + 2999);
        assert_eq!(rejected.len(), 1);
        match &rejected[0] {
            Directive::Send {
                packet: Packet::Message { msg, .. },
                ..
            } => assert_eq!(msg, "Respawn on cooldown, wait 1 sec."),
            _ => panic!("Expected cooldown rejection"),
        }

        // At exactly 3000ms it succeeds again
        let second = commands::respawn(1, &mut game, t0 + 3000);
        assert!(second
            .iter()
            .any(|d| matches!(d, Directive::ScheduleCooldown { session_id: 1 })));
    }

    /// A cooldown timer firing after disconnect must not resurrect state
    #[test]
    fn cooldown_expiry_after_disconnect() {
        let (mut sessions, mut game) = setup(&["Ghost"]);

        commands::respawn(1, &mut game, 1000);
        sessions.remove_session(&1);
        assert_eq!(game.remove_player(&1), Some("Ghost".to_string()));

        assert!(!game.end_cooldown(1));
        assert!(game.is_empty());
    }

    /// Registry size tracks inits, not raw connections
    #[test]
    fn registry_matches_completed_inits() {
        let mut sessions = SessionManager::new(8);
        let mut game = GameState::new(WorldConfig::default());

        let a = sessions.add_session("127.0.0.1:9200".parse().unwrap()).unwrap();
        let _b = sessions.add_session("127.0.0.1:9201".parse().unwrap()).unwrap();

        // Only one session completes init
        game.init_player(a, "A", 0);
        assert_eq!(sessions.len(), 2);
        assert_eq!(game.len(), 1);

        // The uninited session leaving produces no departure announcement
        assert_eq!(game.remove_player(&2), None);
    }
}
