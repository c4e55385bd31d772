#[allow(unused_imports)]
use ::calltrace_runtime as __trace;

pub fn already() {
    let __trace_id = __trace::next();
    __TRACE.log(format_args!("[{}] {}()", __trace_id, "already"));
}

#[allow(dead_code)]
static __TRACE: __trace::Tracer = __trace::Tracer::setup("stderr", "\t", 1024);
