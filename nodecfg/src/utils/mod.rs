mod rate_limit;


pub(crate) use rate_limit::RateLimit;
