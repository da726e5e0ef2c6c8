//! Hard input limits. Violations surface as `LimitExceeded`, never as a
//! panic or a silent truncation.

pub const MAX_NAME_LEN: usize = 120;
pub const MAX_LOCATION_LEN: usize = 120;
pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 2_000;

pub const MAX_EMAIL_LEN: usize = 254;
pub const MAX_USERNAME_LEN: usize = 64;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 256;

/// Cap on meetings held per room, active and cancelled together.
pub const MAX_MEETINGS_PER_ROOM: usize = 10_000;
pub const MAX_ROOMS: usize = 10_000;
pub const MAX_USERS: usize = 100_000;
