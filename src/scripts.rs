//! Script registry: the text of every server-side script this engine ships,
//! each paired with its SHA-1 hash so the common path can `EVALSHA` without
//! a round trip to derive the hash itself.

use std::sync::OnceLock;

/// A single script's text plus its precomputed hash.
#[derive(Debug, Clone, Copy)]
pub struct ScriptInfo {
    pub script: &'static str,
    hash: &'static OnceLock<String>,
}

impl ScriptInfo {
    const fn new(script: &'static str, hash: &'static OnceLock<String>) -> Self {
        Self { script, hash }
    }

    /// SHA-1 of `script`, computed once and memoized.
    pub fn hash(&self) -> &str {
        self.hash
            .get_or_init(|| redis::Script::new(self.script).get_hash().to_string())
    }
}

macro_rules! script {
    ($name:ident, $text:expr) => {
        pub fn $name() -> ScriptInfo {
            static TEXT: &str = $text;
            static HASH: OnceLock<String> = OnceLock::new();
            ScriptInfo::new(TEXT, &HASH)
        }
    };
}

script!(
    fixed_window_limit,
    r#"
local key = KEYS[1]
local window_ms = tonumber(ARGV[1])
local increment_by = tonumber(ARGV[2])

if not window_ms or window_ms <= 0 then
    return redis.error_reply("window_ms must be positive")
end

local existed = redis.call('EXISTS', key)
local count = redis.call('INCRBY', key, increment_by)
if existed == 0 then
    redis.call('PEXPIRE', key, window_ms)
end

return count
"#
);

script!(
    fixed_window_get_remaining,
    r#"
local key = KEYS[1]

local count = tonumber(redis.call('GET', key)) or 0
return count
"#
);

script!(
    sliding_window_limit,
    r#"
local current_key = KEYS[1]
local previous_key = KEYS[2]
local tokens = tonumber(ARGV[1])
local now = tonumber(ARGV[2])
local window_ms = tonumber(ARGV[3])
local increment_by = tonumber(ARGV[4])

local cur = tonumber(redis.call('GET', current_key)) or 0
local prev = tonumber(redis.call('GET', previous_key)) or 0

local p = (now % window_ms) / window_ms
local weighted_prev = math.floor((1 - p) * prev)

if cur + weighted_prev >= tokens then
    return -1
end

local new_cur = redis.call('INCRBY', current_key, increment_by)
if new_cur == increment_by then
    redis.call('PEXPIRE', current_key, (2 * window_ms) + 1000)
end

return tokens - (new_cur + weighted_prev)
"#
);

script!(
    sliding_window_get_remaining,
    r#"
local current_key = KEYS[1]
local previous_key = KEYS[2]
local tokens = tonumber(ARGV[1])
local now = tonumber(ARGV[2])
local window_ms = tonumber(ARGV[3])

local cur = tonumber(redis.call('GET', current_key)) or 0
local prev = tonumber(redis.call('GET', previous_key)) or 0

local p = (now % window_ms) / window_ms
local weighted_prev = math.floor((1 - p) * prev)

local remaining = tokens - (cur + weighted_prev)
if remaining < 0 then
    remaining = 0
end
return remaining
"#
);

script!(
    token_bucket_limit,
    r#"
local key = KEYS[1]
local max_tokens = tonumber(ARGV[1])
local interval_ms = tonumber(ARGV[2])
local refill_rate = tonumber(ARGV[3])
local now = tonumber(ARGV[4])
local increment_by = tonumber(ARGV[5])

local data = redis.call('HMGET', key, 'refilled_at', 'tokens')
local refilled_at = tonumber(data[1])
local tokens = tonumber(data[2])

if not refilled_at then
    refilled_at = now
    tokens = max_tokens
end

if now >= refilled_at + interval_ms then
    local num_refills = math.floor((now - refilled_at) / interval_ms)
    tokens = math.min(max_tokens, tokens + (num_refills * refill_rate))
    refilled_at = refilled_at + (num_refills * interval_ms)
end

if tokens < increment_by then
    local intervals_needed = math.ceil((increment_by - tokens) / refill_rate)
    local retry_after = refilled_at + (intervals_needed * interval_ms)
    redis.call('HSET', key, 'refilled_at', refilled_at, 'tokens', tokens)
    return {0, max_tokens, 0, retry_after - now}
end

local remaining = tokens - increment_by
redis.call('HSET', key, 'refilled_at', refilled_at, 'tokens', remaining)
local ttl = math.ceil((max_tokens - remaining) / refill_rate) * interval_ms * 2
if ttl > 0 then
    redis.call('PEXPIRE', key, ttl)
end

return {1, max_tokens, remaining, (refilled_at + interval_ms) - now}
"#
);

script!(
    token_bucket_get_remaining,
    r#"
local key = KEYS[1]

local data = redis.call('HMGET', key, 'refilled_at', 'tokens')
if not data[1] then
    return {-1, -1}
end

return {tonumber(data[2]), tonumber(data[1])}
"#
);

script!(
    reset_pattern,
    r#"
local pattern = KEYS[1]
local cursor = ARGV[1]
local batch_size = tonumber(ARGV[2])
local max_deletes = tonumber(ARGV[3])

local deleted = 0

repeat
    local result = redis.call('SCAN', cursor, 'MATCH', pattern, 'COUNT', batch_size)
    cursor = result[1]
    local batch = result[2]
    if #batch > 0 then
        deleted = deleted + redis.call('UNLINK', unpack(batch))
    end
until cursor == "0" or deleted >= max_deletes

return {deleted, cursor}
"#
);
