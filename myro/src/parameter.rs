//! Bound parameter and its deferred production.
//!
//! A [`Parameter`] is created by a codec and produces its wire form only when
//! requested, either as binary protocol bytes with
//! [`publish_binary`][Parameter::publish_binary] or as text protocol literal
//! with [`publish_text`][Parameter::publish_text].
use bytes::{BufMut, Bytes};
use futures_core::Stream;
use std::{
    fmt::Write,
    pin::Pin,
    slice,
    task::{Context, Poll, ready},
};

use crate::{
    alloc::{BufAllocator, Lease},
    codec::EncodeError,
    ext::{BufMutExt, lenenc_int_len},
    mysql::TypeCode,
    value::Value,
};

/// A value bound to a statement together with its wire type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter {
    value: Value,
    ty: TypeCode,
}

impl Parameter {
    pub fn new(value: Value, ty: TypeCode) -> Parameter {
        Self { value, ty }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Wire type advertised in the binary protocol.
    pub fn type_code(&self) -> TypeCode {
        self.ty
    }

    /// Whether the unsigned flag should accompany the type code.
    pub fn is_unsigned(&self) -> bool {
        matches!(self.value, Value::U64(_))
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Exact length of the binary form.
    pub fn binary_len(&self) -> usize {
        match &self.value {
            Value::Null => 0,
            Value::Bool(_) | Value::I8(_) => 1,
            Value::I16(_) => 2,
            Value::I32(_) | Value::F32(_) => 4,
            Value::I64(_) | Value::U64(_) | Value::F64(_) => 8,
            Value::String(s) => lenenc_len(s.len()),
            Value::Bytes(b) => lenenc_len(b.len()),
            #[cfg(feature = "time")]
            Value::Date(_) => 1 + 4,
            #[cfg(feature = "time")]
            Value::DateTime(dt) => 1 + datetime_len(dt),
            #[cfg(feature = "json")]
            Value::Json(json) => lenenc_len(json.to_string().len()),
        }
    }

    /// Write the binary form, exactly [`binary_len`][Parameter::binary_len] bytes.
    pub fn write_binary(&self, mut buf: impl BufMut) {
        match &self.value {
            Value::Null => { }
            Value::Bool(v) => buf.put_u8(u8::from(*v)),
            Value::I8(v) => buf.put_i8(*v),
            Value::I16(v) => buf.put_i16_le(*v),
            Value::I32(v) => buf.put_i32_le(*v),
            Value::I64(v) => buf.put_i64_le(*v),
            Value::U64(v) => buf.put_u64_le(*v),
            Value::F32(v) => buf.put_f32_le(*v),
            Value::F64(v) => buf.put_f64_le(*v),
            Value::String(s) => buf.put_lenenc_bytes(s.as_bytes()),
            Value::Bytes(b) => buf.put_lenenc_bytes(b),
            #[cfg(feature = "time")]
            Value::Date(date) => {
                buf.put_u8(4);
                put_date(&mut buf, date);
            },
            #[cfg(feature = "time")]
            Value::DateTime(dt) => {
                let len = datetime_len(dt);
                buf.put_u8(len as u8);
                put_date(&mut buf, &dt.date());
                buf.put_u8(dt.hour());
                buf.put_u8(dt.minute());
                buf.put_u8(dt.second());
                if len == 11 {
                    buf.put_u32_le(dt.microsecond());
                }
            },
            #[cfg(feature = "json")]
            Value::Json(json) => buf.put_lenenc_bytes(json.to_string().as_bytes()),
        }
    }

    /// Produce the binary form into a buffer from `alloc`.
    ///
    /// Nothing is allocated until the returned future is polled.
    pub fn publish_binary<'a, A>(&'a self, alloc: &'a A) -> PublishBinary<'a, A>
    where
        A: BufAllocator + ?Sized,
    {
        PublishBinary { param: Some(self), alloc }
    }

    /// Write the text protocol literal.
    pub fn publish_text(&self, writer: &mut ParameterWriter) {
        match &self.value {
            Value::Null => writer.write_null(),
            Value::Bool(v) => writer.write_int(u8::from(*v)),
            Value::I8(v) => writer.write_int(*v),
            Value::I16(v) => writer.write_int(*v),
            Value::I32(v) => writer.write_int(*v),
            Value::I64(v) => writer.write_int(*v),
            Value::U64(v) => writer.write_int(*v),
            Value::F32(v) => writer.write_display(v),
            Value::F64(v) => writer.write_display(v),
            Value::String(s) => writer.write_str(s),
            Value::Bytes(b) => writer.write_hex(b),
            #[cfg(feature = "time")]
            Value::Date(date) => {
                let (y, m, d) = (date.year(), u8::from(date.month()), date.day());
                writer.write_raw(format_args!("'{y:04}-{m:02}-{d:02}'"));
            },
            #[cfg(feature = "time")]
            Value::DateTime(dt) => {
                let (y, m, d) = (dt.year(), u8::from(dt.month()), dt.day());
                let (h, mi, s, us) = (dt.hour(), dt.minute(), dt.second(), dt.microsecond());
                writer.write_raw(format_args!("'{y:04}-{m:02}-{d:02} {h:02}:{mi:02}:{s:02}.{us:06}'"));
            },
            #[cfg(feature = "json")]
            Value::Json(json) => writer.write_str(&json.to_string()),
        }
    }
}

fn lenenc_len(len: usize) -> usize {
    lenenc_int_len(len as u64) as usize + len
}

#[cfg(feature = "time")]
fn datetime_len(dt: &time::PrimitiveDateTime) -> usize {
    match dt.microsecond() {
        0 => 7,
        _ => 11,
    }
}

#[cfg(feature = "time")]
fn put_date(buf: &mut impl BufMut, date: &time::Date) {
    buf.put_u16_le(date.year() as u16);
    buf.put_u8(date.month().into());
    buf.put_u8(date.day());
}

/// Future returned from [`Parameter::publish_binary`].
///
/// Suspends only while waiting for a buffer. Once acquired, the buffer is
/// either handed to the caller or released back to the allocator.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct PublishBinary<'a, A: ?Sized> {
    param: Option<&'a Parameter>,
    alloc: &'a A,
}

impl<A: BufAllocator + ?Sized> Future for PublishBinary<'_, A> {
    type Output = Result<Bytes, EncodeError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(param) = self.param else {
            panic!("`PublishBinary` polled after completion")
        };

        let required = param.binary_len();
        let buf = ready!(self.alloc.poll_allocate(cx, required))?;
        self.param = None;

        let mut lease = Lease::new(self.alloc, buf);
        if lease.capacity() < required {
            return Poll::Ready(Err(EncodeError::Undersized { required, capacity: lease.capacity() }));
        }

        lease.buf_mut().clear();
        param.write_binary(lease.buf_mut());

        let written = lease.len();
        if written != required {
            return Poll::Ready(Err(EncodeError::SizeMismatch { expect: required, written }));
        }

        Poll::Ready(Ok(lease.into_bytes()))
    }
}

/// Produce binary forms of parameters strictly in declared order.
#[must_use = "streams do nothing unless polled"]
pub struct Bindings<'a, A: ?Sized> {
    params: slice::Iter<'a, Parameter>,
    alloc: &'a A,
    current: Option<PublishBinary<'a, A>>,
}

impl<'a, A: BufAllocator + ?Sized> Bindings<'a, A> {
    pub fn new(params: &'a [Parameter], alloc: &'a A) -> Self {
        Self { params: params.iter(), alloc, current: None }
    }
}

impl<A: BufAllocator + ?Sized> Stream for Bindings<'_, A> {
    type Item = Result<Bytes, EncodeError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let me = &mut *self;
        loop {
            if let Some(current) = me.current.as_mut() {
                let result = ready!(Pin::new(current).poll(cx));
                me.current = None;
                return Poll::Ready(Some(result));
            }
            match me.params.next() {
                Some(param) => me.current = Some(param.publish_binary(me.alloc)),
                None => return Poll::Ready(None),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.params.len() + usize::from(self.current.is_some());
        (len, Some(len))
    }
}

/// Produce binary forms of all parameters in order, stop at the first error.
pub async fn collect_binary<A>(params: &[Parameter], alloc: &A) -> Result<Vec<Bytes>, EncodeError>
where
    A: BufAllocator + ?Sized,
{
    let mut bindings = Bindings::new(params, alloc);
    let mut values = Vec::with_capacity(params.len());
    while let Some(value) = std::future::poll_fn(|cx| Pin::new(&mut bindings).poll_next(cx)).await {
        values.push(value?);
    }
    Ok(values)
}

/// Sink of text protocol literals.
#[derive(Debug, Default)]
pub struct ParameterWriter {
    buf: String,
}

impl ParameterWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn into_string(self) -> String {
        self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn write_null(&mut self) {
        self.buf.push_str("NULL");
    }

    pub fn write_int<I: itoa::Integer>(&mut self, value: I) {
        self.buf.push_str(itoa::Buffer::new().format(value));
    }

    /// Write shortest representation that parse back to the same value.
    pub fn write_display(&mut self, value: impl std::fmt::Display) {
        self.write_raw(format_args!("{value}"));
    }

    /// Write a quoted and escaped string literal.
    pub fn write_str(&mut self, value: &str) {
        self.buf.reserve(value.len() + 2);
        self.buf.push('\'');
        for ch in value.chars() {
            match ch {
                '\0' => self.buf.push_str("\\0"),
                '\'' => self.buf.push_str("\\'"),
                '"' => self.buf.push_str("\\\""),
                '\\' => self.buf.push_str("\\\\"),
                '\n' => self.buf.push_str("\\n"),
                '\r' => self.buf.push_str("\\r"),
                '\x1A' => self.buf.push_str("\\Z"),
                ch => self.buf.push(ch),
            }
        }
        self.buf.push('\'');
    }

    /// Write a hexadecimal literal.
    pub fn write_hex(&mut self, value: &[u8]) {
        const HEX: &[u8; 16] = b"0123456789ABCDEF";
        self.buf.reserve(value.len() * 2 + 3);
        self.buf.push_str("x'");
        for b in value {
            self.buf.push(HEX[usize::from(b >> 4)] as char);
            self.buf.push(HEX[usize::from(b & 0xF)] as char);
        }
        self.buf.push('\'');
    }

    pub(crate) fn write_raw(&mut self, args: std::fmt::Arguments) {
        // writing to `String` is infallible
        let _ = self.buf.write_fmt(args);
    }
}

#[cfg(test)]
mod test {
    use std::{
        hash::{BuildHasher, RandomState},
        task::Waker,
    };

    use bytes::BytesMut;

    use super::*;
    use crate::{
        alloc::{Heap, fixture::{Counting, Exhausted, Failing}},
        mysql::types::{FLOAT, LONGLONG, NULL, VARCHAR},
    };

    fn poll_once<F: Future + Unpin>(fut: &mut F) -> Poll<F::Output> {
        let mut cx = Context::from_waker(Waker::noop());
        Pin::new(fut).poll(&mut cx)
    }

    fn float(v: f32) -> Parameter {
        Parameter::new(Value::F32(v), FLOAT)
    }

    #[test]
    fn float_equality() {
        let hasher = RandomState::new();
        assert_ne!(float(0.0), float(-0.0));
        assert_eq!(float(3.25), float(3.25));
        assert_eq!(hasher.hash_one(float(3.25)), hasher.hash_one(float(3.25)));
        assert_eq!(float(f32::NAN), float(f32::NAN));
    }

    #[test]
    fn publish_binary_float() {
        let param = float(1.0);
        assert_eq!(param.binary_len(), 4);
        let Poll::Ready(bytes) = poll_once(&mut param.publish_binary(&Heap)) else {
            panic!("heap allocation never suspends")
        };
        assert_eq!(&bytes.unwrap()[..], &[0x00, 0x00, 0x80, 0x3F]);
    }

    #[test]
    fn publish_binary_is_lazy() {
        let alloc = Counting::default();
        let param = float(1.0);
        let fut = param.publish_binary(&alloc);
        assert_eq!(alloc.allocated.get(), 0);
        drop(fut);
        assert_eq!(alloc.allocated.get(), 0);
    }

    #[test]
    fn publish_binary_suspends_on_allocation() {
        let param = float(1.0);
        let mut fut = param.publish_binary(&Exhausted);
        assert!(poll_once(&mut fut).is_pending());
        assert!(poll_once(&mut fut).is_pending());
    }

    #[test]
    fn undersized_buffer_is_released() {
        let alloc = Counting { fixed: Some(2), ..Default::default() };
        let param = Parameter::new(Value::I64(1), LONGLONG);
        let Poll::Ready(result) = poll_once(&mut param.publish_binary(&alloc)) else {
            panic!("allocator is always ready")
        };
        assert!(matches!(result, Err(EncodeError::Undersized { required: 8, capacity: 2 })));
        assert_eq!(alloc.released.get(), 1);
    }

    #[test]
    fn produced_buffer_is_not_released() {
        let alloc = Counting::default();
        let param = Parameter::new(Value::I64(-2), LONGLONG);
        let Poll::Ready(result) = poll_once(&mut param.publish_binary(&alloc)) else {
            panic!("allocator is always ready")
        };
        assert_eq!(&result.unwrap()[..], &(-2i64).to_le_bytes());
        assert_eq!(alloc.allocated.get(), 1);
        assert_eq!(alloc.released.get(), 0);
    }

    #[test]
    fn allocation_failure() {
        let param = float(1.0);
        let Poll::Ready(result) = poll_once(&mut param.publish_binary(&Failing)) else {
            panic!("allocator is always ready")
        };
        assert!(matches!(result, Err(EncodeError::Alloc(_))));
    }

    #[test]
    fn bindings_in_order() {
        let params = [
            Parameter::new(Value::I64(1), LONGLONG),
            Parameter::new(Value::Null, NULL),
            Parameter::new(Value::String("foo".into()), VARCHAR),
        ];
        let mut bindings = Bindings::new(&params, &Heap);
        let mut cx = Context::from_waker(Waker::noop());
        assert_eq!(bindings.size_hint(), (3, Some(3)));

        let mut out = vec![];
        while let Poll::Ready(Some(value)) = Pin::new(&mut bindings).poll_next(&mut cx) {
            out.push(value.unwrap());
        }
        assert_eq!(out.len(), 3);
        assert_eq!(&out[0][..], &1i64.to_le_bytes());
        assert!(out[1].is_empty());
        assert_eq!(&out[2][..], b"\x03foo");
    }

    #[test]
    fn collect_binary_in_order() {
        let params = [float(1.0), float(-0.0)];
        let mut fut = std::pin::pin!(collect_binary(&params, &Heap));
        let mut cx = Context::from_waker(Waker::noop());
        let Poll::Ready(values) = fut.as_mut().poll(&mut cx) else {
            panic!("heap allocation never suspends")
        };
        let values = values.unwrap();
        assert_eq!(&values[0][..], &[0x00, 0x00, 0x80, 0x3F]);
        assert_eq!(&values[1][..], &[0x00, 0x00, 0x00, 0x80]);
    }

    fn binary_bytes(param: &Parameter) -> Bytes {
        let mut buf = BytesMut::with_capacity(param.binary_len());
        param.write_binary(&mut buf);
        buf.freeze()
    }

    fn text(param: &Parameter) -> String {
        let mut writer = ParameterWriter::new();
        param.publish_text(&mut writer);
        writer.into_string()
    }

    #[test]
    fn publish_text() {
        assert_eq!(text(&float(1.5)), "1.5");
        assert_eq!(text(&float(-0.0)), "-0");
        assert_eq!(text(&Parameter::new(Value::U64(u64::MAX), LONGLONG)), "18446744073709551615");
        assert_eq!(text(&Parameter::new(Value::Null, NULL)), "NULL");
        assert_eq!(text(&Parameter::new(Value::String("it's \\ \n".into()), VARCHAR)), "'it\\'s \\\\ \\n'");
        assert_eq!(text(&Parameter::new(Value::Bytes(Bytes::from_static(&[0x0A, 0xFF])), VARCHAR)), "x'0AFF'");
    }

    #[test]
    fn binary_string_is_length_encoded() {
        let param = Parameter::new(Value::String("foo".into()), VARCHAR);
        assert_eq!(param.binary_len(), 4);
        assert_eq!(&binary_bytes(&param)[..], b"\x03foo");
    }
}
