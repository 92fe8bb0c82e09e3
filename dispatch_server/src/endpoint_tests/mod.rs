mod conversions;
mod hmac;
