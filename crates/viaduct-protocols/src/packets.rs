//! Packet ids for the versions this crate bridges.

/// Classic with the Classic Protocol Extension set (c0.30 CPE).
pub mod c0_30_cpe {
    pub mod clientbound {
        pub const PING: i32 = 0x01;
        pub const MESSAGE: i32 = 0x0D;
        pub const DISCONNECT: i32 = 0x0E;
        pub const EXT_INFO: i32 = 0x10;
        pub const EXT_ENTRY: i32 = 0x11;
        pub const ENV_WEATHER_TYPE: i32 = 0x1F;
    }

    pub mod serverbound {
        pub const MESSAGE: i32 = 0x0D;
        pub const EXT_INFO: i32 = 0x10;
        pub const EXT_ENTRY: i32 = 0x11;
    }
}

/// Release 1.19.3 (protocol 761), play state.
pub mod r1_19_3 {
    pub mod clientbound {
        pub const DISCONNECT: i32 = 0x17;
        pub const GAME_EVENT: i32 = 0x1C;
        pub const KEEP_ALIVE: i32 = 0x1F;
        pub const SYSTEM_CHAT: i32 = 0x60;
    }

    pub mod serverbound {
        pub const CHAT_MESSAGE: i32 = 0x05;
        pub const KEEP_ALIVE: i32 = 0x11;
    }
}

/// Release 1.19.4 (protocol 762), play state.
pub mod r1_19_4 {
    pub mod clientbound {
        pub const DISCONNECT: i32 = 0x1A;
        pub const GAME_EVENT: i32 = 0x1F;
        pub const KEEP_ALIVE: i32 = 0x23;
        pub const SYSTEM_CHAT: i32 = 0x64;
    }
}

/// Game event subtypes used when translating classic weather.
pub mod game_event {
    pub const RAIN_STATE: u8 = 1;
    pub const RAIN_LEVEL: u8 = 7;
}

/// Classic `EnvWeatherType` values.
pub mod weather {
    pub const SUNNY: i8 = 0;
    pub const RAINING: i8 = 1;
    pub const SNOWING: i8 = 2;
}
